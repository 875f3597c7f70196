// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event tracker binary.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use repique_config::TrackerSettings;
use repique_core::{RepiqueError, StateStore};
use repique_store::{RedisClient, RedisStateStore};
use repique_tracker::{serve, Tracker, TrackerState};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "event tracker terminated with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), RepiqueError> {
    let settings = TrackerSettings::from_env()?;

    let client = RedisClient::connect(&settings.store.redis).await?;
    let store: Arc<dyn StateStore> =
        Arc::new(RedisStateStore::new(client, settings.store.state_ttl));

    let cancel = CancellationToken::new();
    let state = TrackerState {
        tracker: Arc::new(Tracker::new(store)),
        cancel: cancel.clone(),
    };

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    serve(&settings.bind_addr, state, cancel).await?;
    info!("event tracker shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
            _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received Ctrl+C, initiating shutdown");
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let default_level = if repique_config::debug_enabled() {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
