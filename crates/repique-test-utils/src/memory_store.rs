// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`StateStore`] with the same observable semantics as the Redis
//! implementation: `NotFound` for absent states, empty histories, SETNX-like
//! lock acquisition, and a silent no-op touch when the state is gone.
//! Individual operations can be made to fail for error-path tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use repique_core::{JourneyState, RepiqueEntry, RepiqueError, RepiqueHistory, StateStore};

type PairKey = (String, String);

#[derive(Default)]
struct Inner {
    states: HashMap<PairKey, JourneyState>,
    histories: HashMap<PairKey, RepiqueHistory>,
    locks: HashSet<(String, String, String, u32)>,
}

/// Shared in-memory store for tests.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: Mutex<Inner>,
    failing_ops: Mutex<HashSet<&'static str>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future call to `op` fail with a transport error.
    pub fn fail_on(&self, op: &'static str) {
        self.failing_ops.lock().unwrap().insert(op);
    }

    /// Clears failure injection for `op`.
    pub fn recover(&self, op: &'static str) {
        self.failing_ops.lock().unwrap().remove(op);
    }

    /// Seeds a state directly, bypassing the trait surface.
    pub fn seed_state(&self, state: JourneyState) {
        let key = (state.journey_id.clone(), state.customer_number.clone());
        self.inner.lock().unwrap().states.insert(key, state);
    }

    /// Seeds a history directly.
    pub fn seed_history(&self, journey_id: &str, customer_number: &str, history: RepiqueHistory) {
        let key = (journey_id.to_string(), customer_number.to_string());
        self.inner.lock().unwrap().histories.insert(key, history);
    }

    /// Current state snapshot, if present.
    pub fn state(&self, journey_id: &str, customer_number: &str) -> Option<JourneyState> {
        let key = (journey_id.to_string(), customer_number.to_string());
        self.inner.lock().unwrap().states.get(&key).cloned()
    }

    /// Current history snapshot (empty when absent).
    pub fn history(&self, journey_id: &str, customer_number: &str) -> RepiqueHistory {
        let key = (journey_id.to_string(), customer_number.to_string());
        self.inner
            .lock()
            .unwrap()
            .histories
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of lock keys ever created.
    pub fn lock_count(&self) -> usize {
        self.inner.lock().unwrap().locks.len()
    }

    /// Every live state, in unspecified order.
    pub fn all_states(&self) -> Vec<JourneyState> {
        self.inner.lock().unwrap().states.values().cloned().collect()
    }

    fn check(&self, op: &'static str) -> Result<(), RepiqueError> {
        if self.failing_ops.lock().unwrap().contains(op) {
            return Err(RepiqueError::Transport {
                message: format!("injected {op} failure"),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save_state(
        &self,
        _cancel: &CancellationToken,
        state: &JourneyState,
    ) -> Result<(), RepiqueError> {
        self.check("save_state")?;
        self.seed_state(state.clone());
        Ok(())
    }

    async fn get_state(
        &self,
        _cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
    ) -> Result<JourneyState, RepiqueError> {
        self.check("get_state")?;
        self.state(journey_id, customer_number)
            .ok_or(RepiqueError::NotFound)
    }

    async fn delete_state(
        &self,
        _cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
    ) -> Result<(), RepiqueError> {
        self.check("delete_state")?;
        let key = (journey_id.to_string(), customer_number.to_string());
        self.inner.lock().unwrap().states.remove(&key);
        Ok(())
    }

    async fn get_history(
        &self,
        _cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
    ) -> Result<RepiqueHistory, RepiqueError> {
        self.check("get_history")?;
        Ok(self.history(journey_id, customer_number))
    }

    async fn append_history(
        &self,
        _cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
        entry: RepiqueEntry,
    ) -> Result<(), RepiqueError> {
        self.check("append_history")?;
        let key = (journey_id.to_string(), customer_number.to_string());
        self.inner
            .lock()
            .unwrap()
            .histories
            .entry(key)
            .or_default()
            .entries
            .push(entry);
        Ok(())
    }

    async fn acquire_lock(
        &self,
        _cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
        rule_name: &str,
        attempt_number: u32,
    ) -> Result<bool, RepiqueError> {
        self.check("acquire_lock")?;
        let key = (
            journey_id.to_string(),
            customer_number.to_string(),
            rule_name.to_string(),
            attempt_number,
        );
        Ok(self.inner.lock().unwrap().locks.insert(key))
    }

    async fn touch_interaction(
        &self,
        _cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RepiqueError> {
        self.check("touch_interaction")?;
        let key = (journey_id.to_string(), customer_number.to_string());
        if let Some(state) = self.inner.lock().unwrap().states.get_mut(&key) {
            state.last_interaction_at = now;
        }
        Ok(())
    }
}
