// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event tracker HTTP server built on axum.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tracing::info;

use repique_core::RepiqueError;

use crate::handlers;
use crate::tracker::Tracker;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct TrackerState {
    pub tracker: Arc<Tracker>,
    /// Ambient cancellation propagated into store calls.
    pub cancel: CancellationToken,
}

/// Builds the tracker router.
pub fn router(state: TrackerState) -> Router {
    Router::new()
        .route("/journey/event", post(handlers::post_event))
        .route("/journey/finish", post(handlers::post_finish))
        .fallback(handlers::not_found)
        .with_state(state)
}

/// Binds `addr` and serves until `cancel` fires.
pub async fn serve(
    addr: &str,
    state: TrackerState,
    cancel: CancellationToken,
) -> Result<(), RepiqueError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RepiqueError::transport(format!("bind event tracker to {addr}"), e))?;

    info!(addr, "event tracker listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| RepiqueError::transport("event tracker server error", e))
}
