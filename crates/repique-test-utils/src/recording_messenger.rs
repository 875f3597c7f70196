// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording [`Messenger`] that captures outbound messages instead of
//! delivering them. Can be switched into a failing mode for send-failure
//! paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use repique_core::{Messenger, RecoveryMessage, RepiqueError};

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<RecoveryMessage>>,
    failing: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future send fail with a messaging error.
    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<RecoveryMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(
        &self,
        _cancel: &CancellationToken,
        message: &RecoveryMessage,
    ) -> Result<(), RepiqueError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepiqueError::Messaging {
                customer_number: message.customer_number.clone(),
                template_ref: message.template_ref.clone(),
                source: Box::new(std::io::Error::other("injected send failure")),
            });
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
