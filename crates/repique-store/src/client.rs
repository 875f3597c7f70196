// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Universal Redis client.
//!
//! Supports three topologies behind one query surface: a single node or a
//! sentinel-resolved master (both fronted by a bounded bb8 pool), and
//! cluster mode (one cloneable cluster connection that multiplexes per-node
//! links internally). The connection is verified with PING at startup so a
//! misconfigured store fails the process instead of the first run.

use std::time::Duration;

use bb8_redis::{bb8, RedisConnectionManager};
use redis::sentinel::{Sentinel, SentinelNodeConnectionInfo};
use redis::{ConnectionAddr, ConnectionInfo, FromRedisValue, RedisConnectionInfo};
use tracing::info;

use repique_core::RepiqueError;

/// Connection settings for the state store.
#[derive(Debug, Clone)]
pub struct RedisSettings {
    /// `host:port` of the node (or cluster seed).
    pub addr: String,
    pub password: Option<String>,
    pub db: i64,
    pub connect_timeout: Duration,
    /// Upper bound applied to every command round trip.
    pub response_timeout: Duration,
    pub pool_size: u32,
    pub min_idle_conns: u32,
    /// Cluster-mode client instead of a pooled single connection.
    pub cluster_mode: bool,
    /// Non-empty enables sentinel (failover) resolution of the master.
    pub sentinel_addrs: Vec<String>,
    pub master_name: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        RedisSettings {
            addr: "localhost:6379".to_string(),
            password: None,
            db: 0,
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(3),
            pool_size: 10,
            min_idle_conns: 2,
            cluster_mode: false,
            sentinel_addrs: Vec::new(),
            master_name: String::new(),
        }
    }
}

enum Backend {
    Pooled(bb8::Pool<RedisConnectionManager>),
    Cluster(redis::cluster_async::ClusterConnection),
}

/// Shared, cloneable handle to the state store.
#[derive(Clone)]
pub struct RedisClient {
    backend: std::sync::Arc<Backend>,
    response_timeout: Duration,
}

impl RedisClient {
    /// Connects according to `settings` and verifies the link with PING.
    pub async fn connect(settings: &RedisSettings) -> Result<Self, RepiqueError> {
        let backend = if settings.cluster_mode {
            let info = connection_info(&settings.addr, settings)?;
            let client = redis::cluster::ClusterClient::builder(vec![info])
                .build()
                .map_err(|e| RepiqueError::transport("build redis cluster client", e))?;
            let conn = client
                .get_async_connection()
                .await
                .map_err(|e| RepiqueError::transport("connect redis cluster", e))?;
            Backend::Cluster(conn)
        } else if !settings.sentinel_addrs.is_empty() {
            let master = resolve_master(settings).await?;
            Backend::Pooled(build_pool(master, settings).await?)
        } else {
            let info = connection_info(&settings.addr, settings)?;
            Backend::Pooled(build_pool(info, settings).await?)
        };

        let client = RedisClient {
            backend: std::sync::Arc::new(backend),
            response_timeout: settings.response_timeout,
        };

        let pong: String = client.query(&redis::cmd("PING")).await?;
        if pong != "PONG" {
            return Err(RepiqueError::Transport {
                message: format!("unexpected PING reply: {pong}"),
                source: None,
            });
        }
        info!(addr = %settings.addr, cluster = settings.cluster_mode, "connected to redis");

        Ok(client)
    }

    /// Executes one command and decodes the reply.
    pub async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T, RepiqueError> {
        match &*self.backend {
            Backend::Pooled(pool) => {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| RepiqueError::transport("checkout redis connection", e))?;
                self.timed(cmd.query_async(&mut *conn)).await
            }
            Backend::Cluster(conn) => {
                let mut conn = conn.clone();
                self.timed(cmd.query_async(&mut conn)).await
            }
        }
    }

    /// Executes a pipeline and decodes the replies.
    pub async fn query_pipeline<T: FromRedisValue>(
        &self,
        pipe: &redis::Pipeline,
    ) -> Result<T, RepiqueError> {
        match &*self.backend {
            Backend::Pooled(pool) => {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| RepiqueError::transport("checkout redis connection", e))?;
                self.timed(pipe.query_async(&mut *conn)).await
            }
            Backend::Cluster(conn) => {
                let mut conn = conn.clone();
                self.timed(pipe.query_async(&mut conn)).await
            }
        }
    }

    async fn timed<T>(
        &self,
        fut: impl std::future::Future<Output = redis::RedisResult<T>>,
    ) -> Result<T, RepiqueError> {
        match tokio::time::timeout(self.response_timeout, fut).await {
            Ok(res) => res.map_err(|e| RepiqueError::transport("redis command failed", e)),
            Err(_) => Err(RepiqueError::Transport {
                message: format!(
                    "redis command timed out after {:?}",
                    self.response_timeout
                ),
                source: None,
            }),
        }
    }
}

async fn build_pool(
    info: ConnectionInfo,
    settings: &RedisSettings,
) -> Result<bb8::Pool<RedisConnectionManager>, RepiqueError> {
    let manager = RedisConnectionManager::new(info)
        .map_err(|e| RepiqueError::transport("build redis connection manager", e))?;
    bb8::Pool::builder()
        .max_size(settings.pool_size)
        .min_idle(Some(settings.min_idle_conns))
        .connection_timeout(settings.connect_timeout)
        .build(manager)
        .await
        .map_err(|e| RepiqueError::transport("build redis connection pool", e))
}

/// Asks the sentinels for the current master of `master_name`.
async fn resolve_master(settings: &RedisSettings) -> Result<ConnectionInfo, RepiqueError> {
    let sentinel_infos = settings
        .sentinel_addrs
        .iter()
        .map(|addr| connection_info_without_auth(addr))
        .collect::<Result<Vec<_>, _>>()?;
    let mut sentinel = Sentinel::build(sentinel_infos)
        .map_err(|e| RepiqueError::transport("build sentinel client", e))?;

    let node_info = SentinelNodeConnectionInfo {
        tls_mode: None,
        redis_connection_info: Some(RedisConnectionInfo {
            db: settings.db,
            username: None,
            password: settings.password.clone(),
            ..Default::default()
        }),
    };
    let master = sentinel
        .async_master_for(&settings.master_name, Some(&node_info))
        .await
        .map_err(|e| RepiqueError::transport("resolve master via sentinel", e))?;

    Ok(master.get_connection_info().clone())
}

fn connection_info(addr: &str, settings: &RedisSettings) -> Result<ConnectionInfo, RepiqueError> {
    let (host, port) = split_addr(addr)?;
    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: RedisConnectionInfo {
            db: settings.db,
            username: None,
            password: settings.password.clone(),
            ..Default::default()
        },
    })
}

fn connection_info_without_auth(addr: &str) -> Result<ConnectionInfo, RepiqueError> {
    let (host, port) = split_addr(addr)?;
    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host, port),
        redis: RedisConnectionInfo::default(),
    })
}

fn split_addr(addr: &str) -> Result<(String, u16), RepiqueError> {
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse::<u16>().map_err(|_| {
                RepiqueError::Config(format!("invalid redis port in address `{addr}`"))
            })?;
            Ok((host.to_string(), port))
        }
        _ if !addr.is_empty() => Ok((addr.to_string(), 6379)),
        _ => Err(RepiqueError::Config("redis address is empty".into())),
    }
}
