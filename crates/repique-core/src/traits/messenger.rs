// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messenger adapter trait.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::RepiqueError;
use crate::journey::RecoveryMessage;

/// Outbound recovery-message delivery.
///
/// Implementations resolve the template reference, render the body against
/// the message metadata, and deliver over the chat channel. Failures are
/// reported as [`RepiqueError::Messaging`] carrying the customer number and
/// template reference.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(
        &self,
        cancel: &CancellationToken,
        message: &RecoveryMessage,
    ) -> Result<(), RepiqueError>;
}
