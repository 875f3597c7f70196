// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State-store adapter trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::error::RepiqueError;
use crate::journey::{JourneyState, RepiqueEntry, RepiqueHistory};

/// Typed operations over the shared key-value store.
///
/// Both the event tracker and the recovery worker go through this trait;
/// the production implementation is Redis-backed. Implementations must keep
/// the documented not-found semantics: [`get_state`](StateStore::get_state)
/// fails with [`RepiqueError::NotFound`] when the key is absent, while
/// [`get_history`](StateStore::get_history) returns an empty history.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Encodes and writes a journey state with the configured TTL.
    async fn save_state(
        &self,
        cancel: &CancellationToken,
        state: &JourneyState,
    ) -> Result<(), RepiqueError>;

    /// Reads one journey state; `NotFound` when the key is absent.
    async fn get_state(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
    ) -> Result<JourneyState, RepiqueError>;

    /// Deletes a journey state. Idempotent.
    async fn delete_state(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
    ) -> Result<(), RepiqueError>;

    /// Reads the recovery history; an absent key is an empty history.
    async fn get_history(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
    ) -> Result<RepiqueHistory, RepiqueError>;

    /// Appends one history entry, refreshing the TTL.
    ///
    /// Read-modify-write: not atomic across callers on its own. The message
    /// lock gates callers so only one writer is in flight per
    /// `(rule, attempt)`.
    async fn append_history(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
        entry: RepiqueEntry,
    ) -> Result<(), RepiqueError>;

    /// Conditional-create of the per-attempt lock key.
    ///
    /// `true` means the caller owns this attempt; `false` means another
    /// worker got there first and the caller must not send.
    async fn acquire_lock(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
        rule_name: &str,
        attempt_number: u32,
    ) -> Result<bool, RepiqueError>;

    /// Rewrites `last_interaction_at` on the stored state.
    ///
    /// Silently no-ops when the state is gone (the customer finished
    /// between evaluation and touch).
    async fn touch_interaction(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RepiqueError>;
}
