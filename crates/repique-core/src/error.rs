// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared across the repique workspace.

use thiserror::Error;

/// The primary error type used by the state store, caches, messaging
/// clients, and the worker pipeline.
#[derive(Debug, Error)]
pub enum RepiqueError {
    /// The requested record does not exist. Distinguishes an absent state
    /// from a transport failure so callers can take a fresh-create or skip
    /// path instead of failing.
    #[error("not found")]
    NotFound,

    /// Invalid caller-supplied input (bad HTTP payload fields). Never
    /// retried; surfaces as 400 at the tracker boundary.
    #[error("validation error: {0}")]
    Validation(String),

    /// State-store or HTTP I/O failure (Redis, config source, STS, chat API).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed stored or received payload (JSON/YAML decode failure).
    #[error("serialization error: {message}")]
    Serialization {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid journey or template document; fails at load time, never at
    /// dispatch time.
    #[error("config error: {0}")]
    Config(String),

    /// Message dispatch failure bound to one customer and template.
    #[error("messaging: customer={customer_number} template={template_ref}: {source}")]
    Messaging {
        customer_number: String,
        template_ref: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An error bound to a specific journey/customer operation.
    #[error("{op}: journey={journey_id} customer={customer_number}: {source}")]
    Journey {
        journey_id: String,
        customer_number: String,
        op: &'static str,
        source: Box<RepiqueError>,
    },

    /// The ambient cancellation token fired while the operation was in
    /// flight. Treated like a transport failure by callers: logged, counted,
    /// never retried within the run.
    #[error("operation cancelled")]
    Cancelled,
}

impl RepiqueError {
    /// Builds a [`RepiqueError::Transport`] from a message and cause.
    pub fn transport(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RepiqueError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Builds a [`RepiqueError::Serialization`] from a message and cause.
    pub fn serialization(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RepiqueError::Serialization {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wraps an error with the journey/customer/operation it belongs to.
    pub fn journey(
        journey_id: impl Into<String>,
        customer_number: impl Into<String>,
        op: &'static str,
        source: RepiqueError,
    ) -> Self {
        RepiqueError::Journey {
            journey_id: journey_id.into(),
            customer_number: customer_number.into(),
            op,
            source: Box::new(source),
        }
    }

    /// True when the error is the absent-record sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepiqueError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journey_error_display_carries_context() {
        let err = RepiqueError::journey(
            "onboarding-v2",
            "5511999",
            "GetHistory",
            RepiqueError::Transport {
                message: "connection reset".into(),
                source: None,
            },
        );
        let rendered = err.to_string();
        assert!(rendered.contains("GetHistory"), "got: {rendered}");
        assert!(rendered.contains("onboarding-v2"));
        assert!(rendered.contains("5511999"));
        assert!(rendered.contains("connection reset"));
    }

    #[test]
    fn messaging_error_display_carries_template_ref() {
        let err = RepiqueError::Messaging {
            customer_number: "5511999".into(),
            template_ref: "journey.x.templates:step:key".into(),
            source: Box::new(std::io::Error::other("boom")),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("journey.x.templates:step:key"));
        assert!(rendered.contains("boom"));
    }

    #[test]
    fn not_found_sentinel_is_detectable() {
        assert!(RepiqueError::NotFound.is_not_found());
        assert!(!RepiqueError::Cancelled.is_not_found());
    }
}
