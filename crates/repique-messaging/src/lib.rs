// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound messaging for the repique recovery engine.
//!
//! [`MessagingClient`] implements the [`Messenger`] seam: it resolves the
//! template reference against the cached template documents, renders the
//! body with the message metadata, and delivers through the WhatsApp client
//! (which in turn leans on the STS token cache). Every failure is wrapped
//! with the customer number and template reference it belongs to.

pub mod render;
pub mod sts;
pub mod whatsapp;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use repique_config::templates::{parse_template_ref, TemplateStore};
use repique_core::{Messenger, RecoveryMessage, RepiqueError};

pub use render::render;
pub use sts::{StsClient, StsSettings};
pub use whatsapp::{WhatsAppClient, WhatsAppConfig, WhatsAppResponse};

/// Template-resolving, rendering WhatsApp messenger.
pub struct MessagingClient {
    templates: Arc<TemplateStore>,
    whatsapp: WhatsAppClient,
}

impl MessagingClient {
    pub fn new(templates: Arc<TemplateStore>, whatsapp: WhatsAppClient) -> Self {
        MessagingClient {
            templates,
            whatsapp,
        }
    }

    async fn resolve_and_send(
        &self,
        cancel: &CancellationToken,
        message: &RecoveryMessage,
    ) -> Result<WhatsAppResponse, RepiqueError> {
        let reference = parse_template_ref(&message.template_ref)?;

        let document = self.templates.load(cancel, reference.config_name).await?;
        let body = document
            .body(reference.step_name, reference.template_key)
            .ok_or_else(|| {
                RepiqueError::Config(format!(
                    "template '{}' not found in step '{}' for config {}",
                    reference.template_key, reference.step_name, reference.config_name
                ))
            })?;

        let rendered = render::render(body, &message.metadata)?;

        info!(
            customer_number = %message.customer_number,
            rule = %message.rule,
            step = %message.step,
            "sending whatsapp message"
        );

        self.whatsapp
            .send(cancel, &message.customer_number, &rendered)
            .await
    }
}

#[async_trait]
impl Messenger for MessagingClient {
    async fn send(
        &self,
        cancel: &CancellationToken,
        message: &RecoveryMessage,
    ) -> Result<(), RepiqueError> {
        match self.resolve_and_send(cancel, message).await {
            Ok(response) => {
                info!(
                    customer_number = %message.customer_number,
                    message_id = response.message_id().unwrap_or("unknown"),
                    "whatsapp message sent"
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    customer_number = %message.customer_number,
                    template_ref = %message.template_ref,
                    error = %source,
                    "whatsapp send failed"
                );
                Err(RepiqueError::Messaging {
                    customer_number: message.customer_number.clone(),
                    template_ref: message.template_ref.clone(),
                    source: Box::new(source),
                })
            }
        }
    }
}
