// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process settings from environment variables.
//!
//! Deployment injects everything through the environment; there is no
//! settings file. Durations use humantime syntax (`10s`, `24h`).

use std::time::Duration;

use repique_core::RepiqueError;
use repique_store::RedisSettings;

/// Settings shared by every process that opens the state store.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub redis: RedisSettings,
    /// TTL applied to state and history keys.
    pub state_ttl: Duration,
    /// SCAN COUNT hint for the scanner.
    pub scan_count: i64,
}

impl StoreSettings {
    /// Reads `REDIS_ADDR` / `ELASTICACHE_*` / `REDIS_PASSWORD` / `STATE_TTL`.
    pub fn from_env() -> Result<Self, RepiqueError> {
        let mut redis = RedisSettings {
            addr: env_or("REDIS_ADDR", "localhost:6379"),
            password: std::env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            ..RedisSettings::default()
        };

        if let Ok(endpoint) = std::env::var("ELASTICACHE_ENDPOINT") {
            if !endpoint.is_empty() {
                redis.addr = endpoint;
            }
        }
        if std::env::var("ELASTICACHE_CLUSTER_MODE").as_deref() == Ok("true") {
            redis.cluster_mode = true;
        }
        if let Ok(addrs) = std::env::var("ELASTICACHE_SENTINEL_ADDRS") {
            if !addrs.is_empty() {
                redis.sentinel_addrs = addrs.split(',').map(|a| a.trim().to_string()).collect();
                redis.master_name = std::env::var("ELASTICACHE_MASTER_NAME").unwrap_or_default();
            }
        }

        let settings = StoreSettings {
            redis,
            state_ttl: duration_or("STATE_TTL", Duration::from_secs(24 * 60 * 60)),
            scan_count: 100,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), RepiqueError> {
        let mut errors = Vec::new();
        if self.redis.addr.trim().is_empty() {
            errors.push("redis address is required");
        }
        if self.redis.sentinel_addrs.iter().any(|a| !a.is_empty())
            && self.redis.master_name.trim().is_empty()
        {
            errors.push("ELASTICACHE_MASTER_NAME is required with sentinel addresses");
        }
        if self.state_ttl.is_zero() {
            errors.push("state TTL must be positive");
        }
        if self.scan_count <= 0 {
            errors.push("scan count must be positive");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RepiqueError::Config(format!(
                "store settings validation failed: {}",
                errors.join("; ")
            )))
        }
    }
}

/// WhatsApp send policy and endpoints.
#[derive(Debug, Clone)]
pub struct WhatsAppSettings {
    pub api_endpoint: String,
    pub phone_number_id: String,
    pub sts_endpoint: String,
    /// Name under which the OAuth2 credentials are stored in the vault.
    pub secret_name: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl WhatsAppSettings {
    pub fn from_env() -> Result<Self, RepiqueError> {
        let secret_name = std::env::var("WHATSAPP_SECRET_NAME").unwrap_or_default();
        if secret_name.trim().is_empty() {
            return Err(RepiqueError::Config(
                "WHATSAPP_SECRET_NAME environment variable is required".into(),
            ));
        }

        Ok(WhatsAppSettings {
            api_endpoint: env_or("WHATSAPP_API_ENDPOINT", "https://graph.facebook.com/v18.0"),
            phone_number_id: std::env::var("WHATSAPP_PHONE_NUMBER_ID").unwrap_or_default(),
            sts_endpoint: std::env::var("WHATSAPP_STS_ENDPOINT").unwrap_or_default(),
            secret_name,
            timeout: duration_or("WHATSAPP_TIMEOUT", Duration::from_secs(10)),
            max_retries: int_or("WHATSAPP_MAX_RETRIES", 3),
            retry_delay: duration_or("WHATSAPP_RETRY_DELAY", Duration::from_secs(2)),
        })
    }
}

/// Settings for the recovery worker process.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub store: StoreSettings,
    /// Base URL of the read-only configuration source.
    pub appconfig_endpoint: String,
    pub whatsapp: WhatsAppSettings,
    /// Period between runs in local mode.
    pub interval: Duration,
}

impl WorkerSettings {
    pub fn from_env() -> Result<Self, RepiqueError> {
        Ok(WorkerSettings {
            store: StoreSettings::from_env()?,
            appconfig_endpoint: env_or("APPCONFIG_ENDPOINT", "http://localhost:2772"),
            whatsapp: WhatsAppSettings::from_env()?,
            interval: duration_or("WORKER_INTERVAL", Duration::from_secs(60)),
        })
    }
}

/// Settings for the event tracker process.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub store: StoreSettings,
    pub bind_addr: String,
}

impl TrackerSettings {
    pub fn from_env() -> Result<Self, RepiqueError> {
        Ok(TrackerSettings {
            store: StoreSettings::from_env()?,
            bind_addr: env_or("TRACKER_ADDR", "0.0.0.0:8080"),
        })
    }
}

/// True when verbose logging was requested.
pub fn debug_enabled() -> bool {
    std::env::var("DEBUG").map(|v| !v.is_empty()).unwrap_or(false)
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn duration_or(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| humantime::parse_duration(&v).ok())
        .unwrap_or(default)
}

fn int_or(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
