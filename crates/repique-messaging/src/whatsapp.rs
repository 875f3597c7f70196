// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Business API client.
//!
//! Sends rendered text bodies to `{api_endpoint}/{phone_number_id}/messages`
//! with a bearer token from the STS cache. A 4xx carrying a parseable API
//! error body is terminal; network failures and 5xx responses retry up to
//! `max_retries` times with a cancellable delay in between.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use repique_core::{with_cancel, RepiqueError};

use crate::sts::StsClient;

/// Chat-API endpoints and send policy.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// e.g. `https://graph.facebook.com/v18.0`.
    pub api_endpoint: String,
    pub phone_number_id: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    preview_url: bool,
    body: &'a str,
}

/// Successful send acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppResponse {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

impl WhatsAppResponse {
    /// Id of the accepted message, when the API reported one.
    pub fn message_id(&self) -> Option<&str> {
        self.messages.first().map(|m| m.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub wa_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorInfo,
}

#[derive(Debug, Deserialize)]
struct ApiErrorInfo {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    #[allow(dead_code)]
    error_subcode: i64,
    #[serde(default)]
    fbtrace_id: String,
}

/// Whether the attempt may be repeated.
enum AttemptError {
    Fatal(RepiqueError),
    Retryable(RepiqueError),
}

/// Client for the WhatsApp Business messages endpoint.
pub struct WhatsAppClient {
    http: reqwest::Client,
    config: WhatsAppConfig,
    sts: StsClient,
}

impl WhatsAppClient {
    pub fn new(config: WhatsAppConfig, sts: StsClient) -> Result<Self, RepiqueError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RepiqueError::transport("build whatsapp http client", e))?;
        Ok(WhatsAppClient { http, config, sts })
    }

    /// Sends one text message, retrying transient failures.
    pub async fn send(
        &self,
        cancel: &CancellationToken,
        to: &str,
        body: &str,
    ) -> Result<WhatsAppResponse, RepiqueError> {
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                with_cancel(cancel, async {
                    tokio::time::sleep(self.config.retry_delay).await;
                    Ok(())
                })
                .await?;
            }

            match self.send_request(cancel, to, body).await {
                Ok(response) => return Ok(response),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(e)) => {
                    warn!(attempt, error = %e, "whatsapp send attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| RepiqueError::Transport {
            message: format!("send failed after {} retries", self.config.max_retries),
            source: None,
        }))
    }

    async fn send_request(
        &self,
        cancel: &CancellationToken,
        to: &str,
        body: &str,
    ) -> Result<WhatsAppResponse, AttemptError> {
        let token = match self.sts.get_token(cancel).await {
            Ok(token) => token,
            Err(e @ RepiqueError::Cancelled) => return Err(AttemptError::Fatal(e)),
            Err(e) => return Err(AttemptError::Retryable(e)),
        };

        let payload = OutboundMessage {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            kind: "text",
            text: TextContent {
                preview_url: false,
                body,
            },
        };

        let url = format!(
            "{}/{}/messages",
            self.config.api_endpoint, self.config.phone_number_id
        );

        let exchange = async {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&token)
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    AttemptError::Retryable(RepiqueError::transport("send whatsapp request", e))
                })?;

            let status = response.status();
            let raw = response.text().await.map_err(|e| {
                AttemptError::Retryable(RepiqueError::transport("read whatsapp response", e))
            })?;

            if status.is_success() {
                return serde_json::from_str(&raw).map_err(|e| {
                    AttemptError::Fatal(RepiqueError::serialization(
                        "decode whatsapp response",
                        e,
                    ))
                });
            }

            // A client error with a parseable API body is terminal.
            if status.is_client_error() {
                if let Ok(api_err) = serde_json::from_str::<ApiErrorBody>(&raw) {
                    let info = api_err.error;
                    return Err(AttemptError::Fatal(RepiqueError::Transport {
                        message: format!(
                            "whatsapp api error: {} (code: {}, type: {}, trace: {})",
                            info.message, info.code, info.kind, info.fbtrace_id
                        ),
                        source: None,
                    }));
                }
            }

            Err(AttemptError::Retryable(RepiqueError::Transport {
                message: format!("whatsapp api error (status {}): {raw}", status.as_u16()),
                source: None,
            }))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AttemptError::Fatal(RepiqueError::Cancelled)),
            res = exchange => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sts::StsSettings;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_sts(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer, max_retries: u32) -> WhatsAppClient {
        let sts = StsClient::new(StsSettings {
            endpoint: format!("{}/oauth/token", server.uri()),
            client_id: "client-1".into(),
            client_secret: "secret-1".into(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();
        WhatsAppClient::new(
            WhatsAppConfig {
                api_endpoint: server.uri(),
                phone_number_id: "phone-1".into(),
                timeout: Duration::from_secs(2),
                max_retries,
                retry_delay: Duration::from_millis(10),
            },
            sts,
        )
        .unwrap()
    }

    fn success_body() -> serde_json::Value {
        serde_json::json!({
            "messaging_product": "whatsapp",
            "contacts": [{"input": "5511999", "wa_id": "5511999"}],
            "messages": [{"id": "wamid.1"}]
        })
    }

    #[tokio::test]
    async fn sends_the_expected_payload_with_bearer_auth() {
        let server = MockServer::start().await;
        mount_sts(&server).await;
        Mock::given(method("POST"))
            .and(path("/phone-1/messages"))
            .and(header("authorization", "Bearer tok-1"))
            .and(body_partial_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "5511999",
                "type": "text",
                "text": {"preview_url": false, "body": "hello"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .mount(&server)
            .await;

        let response = client(&server, 3)
            .send(&CancellationToken::new(), "5511999", "hello")
            .await
            .unwrap();
        assert_eq!(response.message_id(), Some("wamid.1"));
        assert_eq!(response.contacts[0].wa_id, "5511999");
    }

    #[tokio::test]
    async fn api_4xx_is_not_retried() {
        let server = MockServer::start().await;
        mount_sts(&server).await;
        Mock::given(method("POST"))
            .and(path("/phone-1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "message": "Invalid recipient",
                    "type": "OAuthException",
                    "code": 131026,
                    "error_subcode": 0,
                    "fbtrace_id": "trace-1"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 3)
            .send(&CancellationToken::new(), "bad", "hello")
            .await
            .unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("Invalid recipient"), "got: {rendered}");
        assert!(rendered.contains("131026"));
    }

    #[tokio::test]
    async fn server_error_is_retried_until_success() {
        let server = MockServer::start().await;
        mount_sts(&server).await;
        Mock::given(method("POST"))
            .and(path("/phone-1/messages"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/phone-1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .mount(&server)
            .await;

        let response = client(&server, 3)
            .send(&CancellationToken::new(), "5511999", "hello")
            .await
            .unwrap();
        assert_eq!(response.message_id(), Some("wamid.1"));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_last_error() {
        let server = MockServer::start().await;
        mount_sts(&server).await;
        Mock::given(method("POST"))
            .and(path("/phone-1/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, 2)
            .send(&CancellationToken::new(), "5511999", "hello")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("status 500"), "got: {err}");
    }

    #[tokio::test]
    async fn cancellation_aborts_the_retry_wait() {
        let server = MockServer::start().await;
        mount_sts(&server).await;
        Mock::given(method("POST"))
            .and(path("/phone-1/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let wa = client(&server, 5);
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            child.cancel();
        });

        let err = wa.send(&cancel, "5511999", "hello").await.unwrap_err();
        assert!(matches!(err, RepiqueError::Cancelled));
    }
}
