// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancellation plumbing for suspension points.
//!
//! Every state-store call, HTTP exchange, and retry delay races against the
//! ambient [`CancellationToken`] so shutdown propagates promptly instead of
//! waiting out in-flight I/O.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::RepiqueError;

/// Runs `fut` to completion unless `cancel` fires first.
///
/// Cancellation wins races deterministically (`biased`), so a token that is
/// already cancelled never starts the operation.
pub async fn with_cancel<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, RepiqueError>
where
    F: Future<Output = Result<T, RepiqueError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RepiqueError::Cancelled),
        res = fut => res,
    }
}

/// Poll-style check used between pipeline items and cursor steps.
pub fn ensure_live(cancel: &CancellationToken) -> Result<(), RepiqueError> {
    if cancel.is_cancelled() {
        Err(RepiqueError::Cancelled)
    } else {
        Ok(())
    }
}
