// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth2 client-credentials token cache.
//!
//! One token per process, refreshed when the remaining lifetime drops below
//! the skew window. Readers take the shared lock; on a miss they upgrade to
//! the exclusive lock and re-check before performing the HTTP exchange, so
//! concurrent misses trigger a single fetch. Fetch failures surface to the
//! caller; nothing negative is cached.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use repique_core::{with_cancel, RepiqueError};

/// Refresh a token this long before it actually expires.
const REFRESH_SKEW: Duration = Duration::from_secs(60);

/// STS endpoint and credentials.
#[derive(Debug, Clone)]
pub struct StsSettings {
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + REFRESH_SKEW < self.expires_at
    }
}

/// Memoised access-token provider for the chat API.
pub struct StsClient {
    http: reqwest::Client,
    settings: StsSettings,
    cached: RwLock<Option<CachedToken>>,
}

impl StsClient {
    pub fn new(settings: StsSettings) -> Result<Self, RepiqueError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| RepiqueError::transport("build sts http client", e))?;
        Ok(StsClient {
            http,
            settings,
            cached: RwLock::new(None),
        })
    }

    /// Returns a valid access token, fetching a new one if necessary.
    pub async fn get_token(&self, cancel: &CancellationToken) -> Result<String, RepiqueError> {
        let now = Instant::now();
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.token.clone());
            }
        }

        let mut slot = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh(Instant::now()) {
                return Ok(cached.token.clone());
            }
        }

        let response = with_cancel(cancel, self.fetch_token()).await?;
        let token = response.access_token.clone();
        *slot = Some(CachedToken {
            token: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        });
        tracing::debug!(expires_in = response.expires_in, "sts token refreshed");

        Ok(token)
    }

    async fn fetch_token(&self) -> Result<TokenResponse, RepiqueError> {
        let body = TokenRequest {
            client_id: &self.settings.client_id,
            client_secret: &self.settings.client_secret,
            grant_type: "client_credentials",
        };

        let response = self
            .http
            .post(&self.settings.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RepiqueError::transport("sts token request", e))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| RepiqueError::transport("read sts response", e))?;

        if !status.is_success() {
            return Err(RepiqueError::Transport {
                message: format!("sts error (status {}): {raw}", status.as_u16()),
                source: None,
            });
        }

        let token: TokenResponse = serde_json::from_str(&raw)
            .map_err(|e| RepiqueError::serialization("decode sts response", e))?;

        if token.access_token.is_empty() {
            return Err(RepiqueError::Transport {
                message: "empty access token in sts response".into(),
                source: None,
            });
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(endpoint: String) -> StsClient {
        StsClient::new(StsSettings {
            endpoint,
            client_id: "client-1".into(),
            client_secret: "secret-1".into(),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_and_caches_a_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(serde_json::json!({
                "client_id": "client-1",
                "client_secret": "secret-1",
                "grant_type": "client_credentials"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sts = client(server.uri());
        let cancel = CancellationToken::new();

        assert_eq!(sts.get_token(&cancel).await.unwrap(), "tok-1");
        // Served from cache; the mock expects exactly one hit.
        assert_eq!(sts.get_token(&cancel).await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn concurrent_misses_trigger_a_single_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sts = client(server.uri());
        let cancel = CancellationToken::new();

        // Both readers miss; the write-lock double-check collapses the
        // fetches into one.
        let (a, b) = tokio::join!(sts.get_token(&cancel), sts.get_token(&cancel));
        assert_eq!(a.unwrap(), "tok-1");
        assert_eq!(b.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn short_lived_token_is_refreshed() {
        let server = MockServer::start().await;
        // expires_in below the skew window, so every call refreshes.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-short",
                "token_type": "Bearer",
                "expires_in": 30
            })))
            .expect(2)
            .mount(&server)
            .await;

        let sts = client(server.uri());
        let cancel = CancellationToken::new();

        sts.get_token(&cancel).await.unwrap();
        sts.get_token(&cancel).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let sts = client(server.uri());
        let err = sts.get_token(&CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("status 500"), "got: {err}");
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let sts = client(server.uri());
        let err = sts.get_token(&CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("empty access token"), "got: {err}");
    }

    #[tokio::test]
    async fn cancelled_fetch_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "access_token": "tok",
                        "token_type": "Bearer",
                        "expires_in": 3600
                    }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let sts = client(server.uri());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = sts.get_token(&cancel).await.unwrap_err();
        assert!(matches!(err, RepiqueError::Cancelled));
    }
}
