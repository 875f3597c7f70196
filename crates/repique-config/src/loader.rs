// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Journey configuration cache over a read-only HTTP source.
//!
//! Documents live at `{endpoint}/{config_name}.yaml`. Loads are cached per
//! journey id for the lifetime of the process; population is double-checked
//! under the write lock so concurrent first loads fetch once. On any
//! transport or parse failure the cache stays unpopulated and the error
//! surfaces to the caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use repique_core::{with_cancel, RepiqueError};

use crate::journey::JourneyConfig;

/// Seam between the worker and the configuration source.
#[async_trait]
pub trait JourneyConfigSource: Send + Sync {
    /// Resolves the configuration for one journey.
    async fn load_journey(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
    ) -> Result<Arc<JourneyConfig>, RepiqueError>;
}

/// HTTP-backed, process-wide journey configuration cache.
pub struct ConfigLoader {
    http: reqwest::Client,
    endpoint: String,
    cache: RwLock<HashMap<String, Arc<JourneyConfig>>>,
}

impl ConfigLoader {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RepiqueError> {
        Ok(ConfigLoader {
            http: build_http_client()?,
            endpoint: endpoint.into(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Drops every cached document. Exposed for hot-reload scenarios.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }
}

#[async_trait]
impl JourneyConfigSource for ConfigLoader {
    async fn load_journey(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
    ) -> Result<Arc<JourneyConfig>, RepiqueError> {
        if let Some(cached) = self.cache.read().await.get(journey_id) {
            return Ok(cached.clone());
        }

        let mut cache = self.cache.write().await;
        // Another loader may have populated while we waited for the lock.
        if let Some(cached) = cache.get(journey_id) {
            return Ok(cached.clone());
        }

        let config_name = format!("journey.{journey_id}");
        let data = fetch_profile(&self.http, &self.endpoint, &config_name, cancel).await?;

        let config: JourneyConfig = serde_yaml::from_str(&data).map_err(|e| {
            RepiqueError::Config(format!("parse journey config {config_name}: {e}"))
        })?;
        config.validate()?;

        let config = Arc::new(config);
        cache.insert(journey_id.to_string(), config.clone());
        tracing::debug!(journey_id, "loaded journey config");

        Ok(config)
    }
}

/// Fetches one YAML profile from the configuration source.
pub(crate) async fn fetch_profile(
    http: &reqwest::Client,
    endpoint: &str,
    config_name: &str,
    cancel: &CancellationToken,
) -> Result<String, RepiqueError> {
    let url = format!("{endpoint}/{config_name}.yaml");

    with_cancel(cancel, async {
        let response = http
            .get(&url)
            .send()
            .await
            .map_err(|e| RepiqueError::transport(format!("fetch config {config_name}"), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepiqueError::Config(format!(
                "config not found: {config_name} (status {})",
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| RepiqueError::transport(format!("read config {config_name}"), e))
    })
    .await
}

pub(crate) fn build_http_client() -> Result<reqwest::Client, RepiqueError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| RepiqueError::transport("build config http client", e))
}
