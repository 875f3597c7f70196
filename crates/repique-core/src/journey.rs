// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Journey state and recovery-history domain types.
//!
//! [`JourneyState`] is one live customer inside one journey, keyed by
//! `(journey_id, customer_number)`. [`RepiqueHistory`] is the durable,
//! append-only record of recovery messages sent for that pair; it is the
//! source of truth for attempt counts and is never rewritten.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Free-form event metadata attached to a journey state.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// The current position of a customer within a journey.
///
/// Created by the event tracker on the first event for the pair, mutated on
/// every subsequent event, and touched by the worker after a successful
/// dispatch (only `last_interaction_at`). All timestamps are server clocks;
/// clients never supply them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyState {
    pub journey_id: String,
    pub step: String,
    pub customer_number: String,
    pub tenant_id: String,
    pub contact_id: String,
    pub last_interaction_at: DateTime<Utc>,
    pub step_started_at: DateTime<Utc>,
    pub journey_started_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl JourneyState {
    /// Time elapsed since the customer last interacted, as of `now`.
    pub fn time_since_last_interaction(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_interaction_at
    }

    /// How long the customer has been in the current step, as of `now`.
    pub fn time_in_step(&self, now: DateTime<Utc>) -> Duration {
        now - self.step_started_at
    }
}

/// One recovery-message execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepiqueEntry {
    pub step: String,
    pub rule: String,
    /// Instant at which the dispatch was decided, recorded just before the
    /// network send.
    pub sent_at: DateTime<Utc>,
    pub template_used: String,
    /// 1-based count of executions of the same rule for this pair.
    pub attempt_number: u32,
}

/// Append-only execution history for one `(journey_id, customer_number)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepiqueHistory {
    #[serde(default)]
    pub entries: Vec<RepiqueEntry>,
}

impl RepiqueHistory {
    /// Number of prior executions of a specific rule.
    pub fn rule_attempt_count(&self, rule_name: &str) -> usize {
        self.entries.iter().filter(|e| e.rule == rule_name).count()
    }

    /// Latest `sent_at` among entries for a specific rule, if any.
    pub fn last_attempt_time(&self, rule_name: &str) -> Option<DateTime<Utc>> {
        self.entries
            .iter()
            .filter(|e| e.rule == rule_name)
            .map(|e| e.sent_at)
            .max()
    }

    /// Total executions across all rules.
    pub fn total_attempt_count(&self) -> usize {
        self.entries.len()
    }
}

/// A recovery message ready for template resolution and dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryMessage {
    pub customer_number: String,
    pub tenant_id: String,
    pub contact_id: String,
    /// Template reference in `config_name:step:template_key` form.
    pub template_ref: String,
    /// Name of the rule that fired.
    pub rule: String,
    pub step: String,
    pub metadata: Metadata,
}

impl RecoveryMessage {
    /// Builds a message for a rule firing against `state`.
    pub fn for_rule(state: &JourneyState, rule: &str, template_ref: &str) -> Self {
        RecoveryMessage {
            customer_number: state.customer_number.clone(),
            tenant_id: state.tenant_id.clone(),
            contact_id: state.contact_id.clone(),
            template_ref: template_ref.to_string(),
            rule: rule.to_string(),
            step: state.step.clone(),
            metadata: state.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_state() -> JourneyState {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        JourneyState {
            journey_id: "onboarding-v2".into(),
            step: "personal-data".into(),
            customer_number: "5511999".into(),
            tenant_id: "tenant-123".into(),
            contact_id: "contact-456".into(),
            last_interaction_at: t0,
            step_started_at: t0,
            journey_started_at: t0,
            metadata: Metadata::new(),
        }
    }

    fn entry(rule: &str, sent_at: DateTime<Utc>, attempt: u32) -> RepiqueEntry {
        RepiqueEntry {
            step: "personal-data".into(),
            rule: rule.into(),
            sent_at,
            template_used: "personal-data-soft".into(),
            attempt_number: attempt,
        }
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = sample_state();
        state
            .metadata
            .insert("name".into(), serde_json::json!("Maria"));
        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: JourneyState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(state, decoded);
    }

    #[test]
    fn state_decodes_without_metadata_field() {
        let raw = r#"{
            "journey_id": "j",
            "step": "s",
            "customer_number": "c",
            "tenant_id": "t",
            "contact_id": "k",
            "last_interaction_at": "2026-03-01T12:00:00Z",
            "step_started_at": "2026-03-01T12:00:00Z",
            "journey_started_at": "2026-03-01T12:00:00Z"
        }"#;
        let decoded: JourneyState = serde_json::from_str(raw).unwrap();
        assert!(decoded.metadata.is_empty());
    }

    #[test]
    fn rule_attempt_count_filters_by_rule() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let history = RepiqueHistory {
            entries: vec![
                entry("early", t0, 1),
                entry("late", t0 + Duration::minutes(30), 1),
                entry("early", t0 + Duration::hours(1), 2),
            ],
        };
        assert_eq!(history.rule_attempt_count("early"), 2);
        assert_eq!(history.rule_attempt_count("late"), 1);
        assert_eq!(history.rule_attempt_count("absent"), 0);
        assert_eq!(history.total_attempt_count(), 3);
    }

    #[test]
    fn last_attempt_time_picks_the_maximum() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let later = t0 + Duration::minutes(45);
        // Entries deliberately out of order; max wins, not last.
        let history = RepiqueHistory {
            entries: vec![entry("early", later, 2), entry("early", t0, 1)],
        };
        assert_eq!(history.last_attempt_time("early"), Some(later));
        assert_eq!(history.last_attempt_time("absent"), None);
    }

    #[test]
    fn empty_history_decodes_from_missing_entries() {
        let decoded: RepiqueHistory = serde_json::from_str("{}").unwrap();
        assert_eq!(decoded.total_attempt_count(), 0);
    }

    #[test]
    fn recovery_message_copies_state_fields() {
        let state = sample_state();
        let msg = RecoveryMessage::for_rule(
            &state,
            "early-reminder",
            "journey.onboarding-v2.templates:personal-data:personal-data-soft",
        );
        assert_eq!(msg.customer_number, state.customer_number);
        assert_eq!(msg.step, state.step);
        assert_eq!(msg.rule, "early-reminder");
    }
}
