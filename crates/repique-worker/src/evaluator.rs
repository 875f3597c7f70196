// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recovery-rule evaluation.
//!
//! A pure function of `(rule, global config, state, history, now)`, with no
//! I/O and no clock reads, so every predicate is table-testable. Predicates
//! run in a fixed order and the first failure wins:
//!
//! 1. rule enabled
//! 2. global attempt budget not exhausted
//! 3. per-rule attempt budget not exhausted
//! 4. minimum interval since the last attempt of the same rule elapsed
//! 5. customer inactive for at least the rule's window

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use repique_config::{GlobalConfig, RecoveryRule};
use repique_core::{JourneyState, RepiqueHistory};

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation<'a> {
    pub triggered: bool,
    pub rule: &'a RecoveryRule,
    pub reason: &'static str,
}

/// Evaluates a single recovery rule.
pub fn evaluate_rule<'a>(
    rule: &'a RecoveryRule,
    global: &GlobalConfig,
    state: &JourneyState,
    history: &RepiqueHistory,
    now: DateTime<Utc>,
) -> Evaluation<'a> {
    let skip = |reason| Evaluation {
        triggered: false,
        rule,
        reason,
    };

    if !rule.enabled {
        return skip("rule disabled");
    }

    if history.total_attempt_count() >= global.max_total_attempts as usize {
        return skip("global max total attempts exceeded");
    }

    if history.rule_attempt_count(&rule.name) >= rule.max_attempts as usize {
        return skip("rule max attempts exceeded");
    }

    if let Some(last_attempt) = history.last_attempt_time(&rule.name) {
        let min_interval =
            Duration::minutes(global.min_interval_between_attempts_minutes as i64);
        if now - last_attempt < min_interval {
            return skip("min interval not reached");
        }
    }

    let inactivity_threshold = Duration::minutes(rule.inactive_minutes as i64);
    if state.time_since_last_interaction(now) < inactivity_threshold {
        return skip("inactivity threshold not reached");
    }

    Evaluation {
        triggered: true,
        rule,
        reason: "all conditions met",
    }
}

/// Picks the single rule to fire for a step, or none.
///
/// When several rules trigger at once the overlap is a configuration smell:
/// a warning lists every triggered rule and the one that waited longest
/// (largest `inactive_minutes`, first occurrence on ties) is chosen as the
/// safest single message.
pub fn select_triggered_rule<'a>(
    rules: &'a [RecoveryRule],
    global: &GlobalConfig,
    state: &JourneyState,
    history: &RepiqueHistory,
    now: DateTime<Utc>,
) -> Option<Evaluation<'a>> {
    let triggered: Vec<Evaluation<'a>> = rules
        .iter()
        .map(|rule| evaluate_rule(rule, global, state, history, now))
        .filter(|evaluation| evaluation.triggered)
        .collect();

    if triggered.is_empty() {
        return None;
    }

    if triggered.len() > 1 {
        let names: Vec<&str> = triggered.iter().map(|e| e.rule.name.as_str()).collect();
        warn!(
            triggered_rules = ?names,
            journey_id = %state.journey_id,
            customer_number = %state.customer_number,
            step = %state.step,
            "multiple rules triggered simultaneously; selecting the longest inactivity window"
        );
    }

    let mut selected = triggered[0];
    for candidate in &triggered[1..] {
        if candidate.rule.inactive_minutes > selected.rule.inactive_minutes {
            selected = *candidate;
        }
    }
    Some(selected)
}
