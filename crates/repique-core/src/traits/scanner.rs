// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scanner adapter trait.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::RepiqueError;
use crate::journey::JourneyState;

/// Enumeration of active journey states from the store.
///
/// Ordering of the returned states is unspecified. Individual records that
/// fail to fetch or decode are skipped, never fatal; only transport failures
/// and cancellation abort a scan.
#[async_trait]
pub trait JourneyScanner: Send + Sync {
    /// Returns every active journey state across all journeys.
    async fn scan_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<JourneyState>, RepiqueError>;
}
