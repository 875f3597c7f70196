// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers for the event tracker.
//!
//! Every response is JSON with a uniform shape: `{data: {...}}` on success
//! and `{error, message}` on failure, where `error` is the canonical status
//! text. Validation problems are 400s naming the offending field; internal
//! failures are 500s with a short message.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use repique_core::RepiqueError;

use crate::server::TrackerState;
use crate::tracker::{EventRequest, FinishRequest};

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Builds the uniform error response for a status code.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        message: message.to_string(),
    };
    (status, Json(body)).into_response()
}

fn ok_response() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({"data": {"status": "ok"}})),
    )
        .into_response()
}

/// POST /journey/event
pub async fn post_event(
    State(state): State<TrackerState>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        warn!("invalid request body");
        return error_response(StatusCode::BAD_REQUEST, "invalid request body");
    };

    if let Err(e) = request.validate() {
        warn!(error = %e, "validation failed");
        return validation_response(e);
    }

    match state.tracker.record_event(&state.cancel, &request).await {
        Ok(()) => ok_response(),
        Err(e) => {
            error!(error = %e, "failed to record event");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// POST /journey/finish
pub async fn post_finish(
    State(state): State<TrackerState>,
    payload: Result<Json<FinishRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        warn!("invalid request body");
        return error_response(StatusCode::BAD_REQUEST, "invalid request body");
    };

    if let Err(e) = request.validate() {
        warn!(error = %e, "validation failed");
        return validation_response(e);
    }

    match state.tracker.finish_journey(&state.cancel, &request).await {
        Ok(()) => ok_response(),
        Err(e) => {
            error!(error = %e, "failed to finish journey");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "route not found")
}

fn validation_response(err: RepiqueError) -> Response {
    let message = match err {
        RepiqueError::Validation(message) => message,
        other => other.to_string(),
    };
    error_response(StatusCode::BAD_REQUEST, &message)
}
