// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key layout for the state store.
//!
//! The layout is a wire contract shared by the tracker and every worker in
//! the fleet; changing it strands live state.

/// Scan pattern matching every active journey state.
pub const STATE_SCAN_PATTERN: &str = "journey:*:*:state";

/// Key holding one customer's journey state.
pub fn journey_state_key(journey_id: &str, customer_number: &str) -> String {
    format!("journey:{journey_id}:{customer_number}:state")
}

/// Key holding one customer's recovery history.
pub fn repique_history_key(journey_id: &str, customer_number: &str) -> String {
    format!("journey:{journey_id}:{customer_number}:repiques")
}

/// Singleton key guarding one `(rule, attempt_number)` dispatch.
pub fn message_lock_key(
    journey_id: &str,
    customer_number: &str,
    rule_name: &str,
    attempt_number: u32,
) -> String {
    format!("journey:{journey_id}:{customer_number}:lock:{rule_name}:{attempt_number}")
}

/// Scan pattern matching every state of one journey.
pub fn journey_scan_pattern(journey_id: &str) -> String {
    format!("journey:{journey_id}:*:state")
}
