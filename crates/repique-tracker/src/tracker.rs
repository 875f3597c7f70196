// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event tracking business logic.
//!
//! Upserts journey state on every customer event, enforcing the timestamp
//! invariants: `journey_started_at` never changes after creation,
//! `step_started_at` moves only when the step changes, and
//! `last_interaction_at` is stamped with the server clock on every event.
//! Clients never supply timestamps.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use repique_core::{JourneyState, Metadata, RepiqueError, StateStore};

/// A journey event from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRequest {
    #[serde(default)]
    pub journey_id: String,
    #[serde(default)]
    pub step: String,
    #[serde(default)]
    pub customer_number: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub contact_id: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl EventRequest {
    /// All fields except `metadata` are required and non-empty.
    pub fn validate(&self) -> Result<(), RepiqueError> {
        let missing = [
            ("journey_id", &self.journey_id),
            ("step", &self.step),
            ("customer_number", &self.customer_number),
            ("tenant_id", &self.tenant_id),
            ("contact_id", &self.contact_id),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty());

        match missing {
            Some((field, _)) => Err(RepiqueError::Validation(format!("{field} is required"))),
            None => Ok(()),
        }
    }
}

/// A request to finish a journey.
#[derive(Debug, Clone, Deserialize)]
pub struct FinishRequest {
    #[serde(default)]
    pub journey_id: String,
    #[serde(default)]
    pub customer_number: String,
}

impl FinishRequest {
    pub fn validate(&self) -> Result<(), RepiqueError> {
        if self.journey_id.is_empty() {
            return Err(RepiqueError::Validation("journey_id is required".into()));
        }
        if self.customer_number.is_empty() {
            return Err(RepiqueError::Validation(
                "customer_number is required".into(),
            ));
        }
        Ok(())
    }
}

/// Journey event tracking over the shared state store.
pub struct Tracker {
    store: Arc<dyn StateStore>,
}

impl Tracker {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Tracker { store }
    }

    /// Records one customer event, creating or updating the journey state.
    pub async fn record_event(
        &self,
        cancel: &CancellationToken,
        request: &EventRequest,
    ) -> Result<(), RepiqueError> {
        let now = Utc::now();

        let existing = match self
            .store
            .get_state(cancel, &request.journey_id, &request.customer_number)
            .await
        {
            Ok(state) => Some(state),
            Err(RepiqueError::NotFound) => None,
            Err(e) => return Err(e),
        };

        let mut state = JourneyState {
            journey_id: request.journey_id.clone(),
            step: request.step.clone(),
            customer_number: request.customer_number.clone(),
            tenant_id: request.tenant_id.clone(),
            contact_id: request.contact_id.clone(),
            last_interaction_at: now,
            step_started_at: now,
            journey_started_at: now,
            metadata: request.metadata.clone().unwrap_or_default(),
        };

        if let Some(existing) = &existing {
            // Journey start never changes; step start survives while the
            // customer stays in the same step.
            state.journey_started_at = existing.journey_started_at;
            if existing.step == request.step {
                state.step_started_at = existing.step_started_at;
            }
        }

        self.store.save_state(cancel, &state).await?;

        info!(
            journey_id = %request.journey_id,
            customer_number = %request.customer_number,
            step = %request.step,
            is_new_journey = existing.is_none(),
            step_changed = existing.as_ref().is_some_and(|e| e.step != request.step),
            "event recorded"
        );
        Ok(())
    }

    /// Finishes a journey by deleting its state. Idempotent.
    pub async fn finish_journey(
        &self,
        cancel: &CancellationToken,
        request: &FinishRequest,
    ) -> Result<(), RepiqueError> {
        self.store
            .delete_state(cancel, &request.journey_id, &request.customer_number)
            .await?;

        info!(
            journey_id = %request.journey_id,
            customer_number = %request.customer_number,
            "journey finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repique_test_utils::MemoryStateStore;

    fn event(step: &str) -> EventRequest {
        EventRequest {
            journey_id: "onboarding-v2".into(),
            step: step.into(),
            customer_number: "5511999".into(),
            tenant_id: "tenant-123".into(),
            contact_id: "contact-456".into(),
            metadata: None,
        }
    }

    #[test]
    fn event_validation_names_the_missing_field() {
        let mut request = event("personal-data");
        request.step = String::new();
        let err = request.validate().unwrap_err();
        assert_eq!(err.to_string(), "validation error: step is required");

        let mut request = event("personal-data");
        request.tenant_id = String::new();
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("tenant_id is required"));
    }

    #[test]
    fn finish_validation_names_the_missing_field() {
        let request = FinishRequest {
            journey_id: String::new(),
            customer_number: "5511999".into(),
        };
        assert!(request
            .validate()
            .unwrap_err()
            .to_string()
            .contains("journey_id is required"));
    }

    #[tokio::test]
    async fn first_event_creates_the_state() {
        let store = Arc::new(MemoryStateStore::new());
        let tracker = Tracker::new(store.clone());
        let cancel = CancellationToken::new();

        tracker.record_event(&cancel, &event("personal-data")).await.unwrap();

        let state = store.state("onboarding-v2", "5511999").unwrap();
        assert_eq!(state.step, "personal-data");
        assert_eq!(state.journey_started_at, state.step_started_at);
        assert_eq!(state.journey_started_at, state.last_interaction_at);
    }

    #[tokio::test]
    async fn step_change_preserves_journey_start_and_moves_step_start() {
        let store = Arc::new(MemoryStateStore::new());
        let tracker = Tracker::new(store.clone());
        let cancel = CancellationToken::new();

        tracker.record_event(&cancel, &event("step-a")).await.unwrap();
        let first = store.state("onboarding-v2", "5511999").unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        tracker.record_event(&cancel, &event("step-b")).await.unwrap();
        let second = store.state("onboarding-v2", "5511999").unwrap();

        assert_eq!(second.journey_started_at, first.journey_started_at);
        assert!(second.step_started_at > first.step_started_at);
        assert!(second.last_interaction_at > first.last_interaction_at);
        assert_eq!(second.step, "step-b");
    }

    #[tokio::test]
    async fn same_step_event_preserves_step_start() {
        let store = Arc::new(MemoryStateStore::new());
        let tracker = Tracker::new(store.clone());
        let cancel = CancellationToken::new();

        tracker.record_event(&cancel, &event("step-a")).await.unwrap();
        let first = store.state("onboarding-v2", "5511999").unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        tracker.record_event(&cancel, &event("step-a")).await.unwrap();
        let second = store.state("onboarding-v2", "5511999").unwrap();

        assert_eq!(second.step_started_at, first.step_started_at);
        assert!(second.last_interaction_at > first.last_interaction_at);
    }

    #[tokio::test]
    async fn metadata_is_replaced_by_each_event() {
        let store = Arc::new(MemoryStateStore::new());
        let tracker = Tracker::new(store.clone());
        let cancel = CancellationToken::new();

        let mut request = event("step-a");
        let mut metadata = Metadata::new();
        metadata.insert("name".into(), serde_json::json!("Maria"));
        request.metadata = Some(metadata);
        tracker.record_event(&cancel, &request).await.unwrap();

        let state = store.state("onboarding-v2", "5511999").unwrap();
        assert_eq!(state.metadata["name"], serde_json::json!("Maria"));
    }

    #[tokio::test]
    async fn finish_is_idempotent() {
        let store = Arc::new(MemoryStateStore::new());
        let tracker = Tracker::new(store.clone());
        let cancel = CancellationToken::new();

        tracker.record_event(&cancel, &event("step-a")).await.unwrap();
        let request = FinishRequest {
            journey_id: "onboarding-v2".into(),
            customer_number: "5511999".into(),
        };

        tracker.finish_journey(&cancel, &request).await.unwrap();
        assert!(store.state("onboarding-v2", "5511999").is_none());
        // Finishing again behaves identically.
        tracker.finish_journey(&cancel, &request).await.unwrap();
    }
}
