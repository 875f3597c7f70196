// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-state dispatch with the idempotent protocol.
//!
//! For one journey state: load the history, select at most one rule, then
//! lock → append history → send → touch. The order is load-bearing: the
//! history entry is written *before* the network send, so a crash in
//! between loses the message rather than duplicating it, and the lock key
//! keeps a second worker from racing the same `(rule, attempt)`.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use repique_config::{build_template_ref, JourneyConfig};
use repique_core::{
    JourneyState, Messenger, RecoveryMessage, RepiqueEntry, RepiqueError, StateStore,
};
use tokio_util::sync::CancellationToken;

use crate::evaluator::select_triggered_rule;

/// Evaluates and dispatches recovery messages for single states.
pub struct Processor {
    store: Arc<dyn StateStore>,
    messenger: Arc<dyn Messenger>,
}

impl Processor {
    pub fn new(store: Arc<dyn StateStore>, messenger: Arc<dyn Messenger>) -> Self {
        Processor { store, messenger }
    }

    /// Processes one journey state, sending at most one recovery message.
    pub async fn process_journey(
        &self,
        cancel: &CancellationToken,
        config: &JourneyConfig,
        state: &JourneyState,
    ) -> Result<(), RepiqueError> {
        let journey_id = state.journey_id.as_str();
        let customer = state.customer_number.as_str();

        if !config.global.enabled {
            debug!(journey_id, customer_number = customer, "journey disabled, skipping");
            return Ok(());
        }

        let now = Utc::now();

        let history = self
            .store
            .get_history(cancel, journey_id, customer)
            .await
            .map_err(|e| RepiqueError::journey(journey_id, customer, "GetHistory", e))?;

        let Some(step) = config.find_step(&state.step) else {
            warn!(
                journey_id,
                customer_number = customer,
                step = %state.step,
                "step not found in config"
            );
            return Ok(());
        };

        let Some(selected) =
            select_triggered_rule(&step.recovery_rules, &config.global, state, &history, now)
        else {
            debug!(journey_id, customer_number = customer, "no rules triggered");
            return Ok(());
        };
        let rule = selected.rule;

        info!(
            journey_id,
            customer_number = customer,
            rule = %rule.name,
            reason = selected.reason,
            inactive_minutes = rule.inactive_minutes,
            "recovery rule triggered"
        );

        let attempt_number = history.rule_attempt_count(&rule.name) as u32 + 1;

        let acquired = self
            .store
            .acquire_lock(cancel, journey_id, customer, &rule.name, attempt_number)
            .await
            .map_err(|e| RepiqueError::journey(journey_id, customer, "AcquireLock", e))?;
        if !acquired {
            info!(
                journey_id,
                customer_number = customer,
                rule = %rule.name,
                attempt_number,
                "another worker owns this attempt, skipping"
            );
            return Ok(());
        }

        // History before send: a crash past this point costs a message, not
        // a duplicate.
        let entry = RepiqueEntry {
            step: state.step.clone(),
            rule: rule.name.clone(),
            sent_at: now,
            template_used: rule.template.clone(),
            attempt_number,
        };
        self.store
            .append_history(cancel, journey_id, customer, entry)
            .await
            .map_err(|e| RepiqueError::journey(journey_id, customer, "AppendHistory", e))?;

        let template_ref = build_template_ref(&config.journey, &state.step, &rule.template);
        let message = RecoveryMessage::for_rule(state, &rule.name, &template_ref);

        if let Err(e) = self.messenger.send(cancel, &message).await {
            // History stays recorded and the lock keeps its TTL; a lost
            // message is preferred over a duplicate.
            error!(
                journey_id,
                customer_number = customer,
                rule = %rule.name,
                error = %e,
                "recovery message send failed"
            );
            return Err(e);
        }

        if let Err(e) = self
            .store
            .touch_interaction(cancel, journey_id, customer, now)
            .await
        {
            warn!(
                journey_id,
                customer_number = customer,
                error = %e,
                "failed to update last interaction after send"
            );
        }

        info!(
            journey_id,
            customer_number = customer,
            rule = %rule.name,
            attempt = attempt_number,
            "recovery message sent"
        );
        Ok(())
    }
}
