// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth2 credential acquisition seam.
//!
//! Credentials live in an external secret vault owned by the deployment.
//! The pipeline only depends on [`CredentialSource`]; vault SDK bindings
//! implement the trait out of tree. [`EnvCredentialSource`] resolves the
//! secret name against a same-named environment variable holding the JSON
//! blob, which is how local runs inject credentials.

use async_trait::async_trait;
use serde::Deserialize;

use repique_core::RepiqueError;

/// OAuth2 client credentials for the messaging STS.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Resolves a named secret to messaging credentials.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn resolve(&self, secret_name: &str) -> Result<WhatsAppCredentials, RepiqueError>;
}

/// Credential source reading the secret from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialSource;

#[async_trait]
impl CredentialSource for EnvCredentialSource {
    async fn resolve(&self, secret_name: &str) -> Result<WhatsAppCredentials, RepiqueError> {
        if secret_name.is_empty() {
            return Err(RepiqueError::Config("secret name is empty".into()));
        }

        let raw = std::env::var(secret_name).map_err(|_| {
            RepiqueError::Config(format!(
                "secret {secret_name} not present in the environment"
            ))
        })?;

        parse_credentials(secret_name, &raw)
    }
}

fn parse_credentials(secret_name: &str, raw: &str) -> Result<WhatsAppCredentials, RepiqueError> {
    let credentials: WhatsAppCredentials = serde_json::from_str(raw)
        .map_err(|e| RepiqueError::Config(format!("parse secret {secret_name} as JSON: {e}")))?;

    if credentials.client_id.is_empty() {
        return Err(RepiqueError::Config(format!(
            "secret {secret_name} missing required field: client_id"
        )));
    }
    if credentials.client_secret.is_empty() {
        return Err(RepiqueError::Config(format!(
            "secret {secret_name} missing required field: client_secret"
        )));
    }

    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_secret_parses() {
        let creds = parse_credentials(
            "whatsapp/prod",
            r#"{"client_id":"abc","client_secret":"xyz"}"#,
        )
        .unwrap();
        assert_eq!(creds.client_id, "abc");
        assert_eq!(creds.client_secret, "xyz");
    }

    #[test]
    fn missing_fields_are_rejected() {
        let err = parse_credentials("s", r#"{"client_id":"abc","client_secret":""}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("client_secret"), "got: {err}");

        let err = parse_credentials("s", r#"{"client_id":"","client_secret":"xyz"}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("client_id"), "got: {err}");
    }

    #[test]
    fn non_json_secret_is_rejected() {
        assert!(parse_credentials("s", "plain-text-token").is_err());
    }

    #[tokio::test]
    async fn env_source_resolves_from_the_environment() {
        std::env::set_var(
            "REPIQUE_TEST_SECRET",
            r#"{"client_id":"id-1","client_secret":"sec-1"}"#,
        );
        let creds = EnvCredentialSource
            .resolve("REPIQUE_TEST_SECRET")
            .await
            .unwrap();
        assert_eq!(creds.client_id, "id-1");
        std::env::remove_var("REPIQUE_TEST_SECRET");
    }

    #[tokio::test]
    async fn env_source_reports_missing_secrets() {
        let err = EnvCredentialSource
            .resolve("REPIQUE_TEST_SECRET_ABSENT")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not present"));
    }
}
