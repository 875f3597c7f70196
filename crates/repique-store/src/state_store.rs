// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis implementation of the [`StateStore`] trait.
//!
//! States and histories are JSON blobs under the keys in
//! [`repique_core::keys`], all carrying the configured TTL. The per-attempt
//! message lock is a conditional-create (`SET NX`) with its own short TTL;
//! it is the only primitive that coordinates concurrent workers, so the
//! history append can stay a plain read-modify-write.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use repique_core::keys;
use repique_core::{with_cancel, JourneyState, RepiqueEntry, RepiqueError, RepiqueHistory, StateStore};

use crate::client::RedisClient;

/// Lifetime of a message lock. Long enough to complete one send, short
/// enough that a crashed worker does not block the attempt forever.
pub const MESSAGE_LOCK_TTL: Duration = Duration::from_secs(5 * 60);

/// State store backed by the shared Redis client.
pub struct RedisStateStore {
    client: RedisClient,
    ttl: Duration,
}

impl RedisStateStore {
    /// Creates a store applying `ttl` to state and history keys.
    pub fn new(client: RedisClient, ttl: Duration) -> Self {
        RedisStateStore { client, ttl }
    }

    async fn set_json(&self, key: &str, payload: String, ttl: Duration) -> Result<(), RepiqueError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(payload).arg("EX").arg(ttl.as_secs().max(1));
        let _: () = self.client.query(&cmd).await?;
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, RepiqueError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.client.query(&cmd).await
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn save_state(
        &self,
        cancel: &CancellationToken,
        state: &JourneyState,
    ) -> Result<(), RepiqueError> {
        let key = keys::journey_state_key(&state.journey_id, &state.customer_number);
        let payload = serde_json::to_string(state)
            .map_err(|e| RepiqueError::serialization("encode journey state", e))?;
        with_cancel(cancel, self.set_json(&key, payload, self.ttl)).await
    }

    async fn get_state(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
    ) -> Result<JourneyState, RepiqueError> {
        let key = keys::journey_state_key(journey_id, customer_number);
        let raw = with_cancel(cancel, self.get_raw(&key)).await?;
        match raw {
            Some(data) => serde_json::from_str(&data)
                .map_err(|e| RepiqueError::serialization("decode journey state", e)),
            None => Err(RepiqueError::NotFound),
        }
    }

    async fn delete_state(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
    ) -> Result<(), RepiqueError> {
        let key = keys::journey_state_key(journey_id, customer_number);
        with_cancel(cancel, async {
            let mut cmd = redis::cmd("DEL");
            cmd.arg(&key);
            let _: i64 = self.client.query(&cmd).await?;
            Ok(())
        })
        .await
    }

    async fn get_history(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
    ) -> Result<RepiqueHistory, RepiqueError> {
        let key = keys::repique_history_key(journey_id, customer_number);
        let raw = with_cancel(cancel, self.get_raw(&key)).await?;
        match raw {
            Some(data) => serde_json::from_str(&data)
                .map_err(|e| RepiqueError::serialization("decode repique history", e)),
            None => Ok(RepiqueHistory::default()),
        }
    }

    async fn append_history(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
        entry: RepiqueEntry,
    ) -> Result<(), RepiqueError> {
        let mut history = self.get_history(cancel, journey_id, customer_number).await?;
        history.entries.push(entry);

        let payload = serde_json::to_string(&history)
            .map_err(|e| RepiqueError::serialization("encode repique history", e))?;
        let key = keys::repique_history_key(journey_id, customer_number);
        with_cancel(cancel, self.set_json(&key, payload, self.ttl)).await
    }

    async fn acquire_lock(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
        rule_name: &str,
        attempt_number: u32,
    ) -> Result<bool, RepiqueError> {
        let key = keys::message_lock_key(journey_id, customer_number, rule_name, attempt_number);
        with_cancel(cancel, async {
            let mut cmd = redis::cmd("SET");
            cmd.arg(&key)
                .arg("locked")
                .arg("NX")
                .arg("EX")
                .arg(MESSAGE_LOCK_TTL.as_secs());
            // SET NX replies OK when the key was created, nil when it existed.
            let reply: Option<String> = self.client.query(&cmd).await?;
            Ok(reply.is_some())
        })
        .await
    }

    async fn touch_interaction(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
        customer_number: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RepiqueError> {
        let mut state = match self.get_state(cancel, journey_id, customer_number).await {
            Ok(state) => state,
            // Customer finished between evaluation and touch.
            Err(RepiqueError::NotFound) => return Ok(()),
            Err(e) => return Err(e),
        };
        state.last_interaction_at = now;
        self.save_state(cancel, &state).await
    }
}
