// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cursor-based enumeration of active journey states.
//!
//! SCAN yields key batches of up to `scan_count`; keys accumulate until
//! `pipeline_size` is reached (or the cursor wraps to zero), then one
//! pipelined multi-get fetches the values. A record that fails to fetch or
//! decode is logged and skipped; only transport failures and cancellation
//! abort the scan.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use repique_core::keys;
use repique_core::{ensure_live, with_cancel, JourneyScanner, JourneyState, RepiqueError};

use crate::client::RedisClient;

/// Default SCAN COUNT hint.
pub const DEFAULT_SCAN_COUNT: i64 = 100;
/// Keys accumulated before a pipelined fetch.
pub const DEFAULT_PIPELINE_SIZE: usize = 100;

/// Scanner over the shared Redis client.
pub struct RedisScanner {
    client: RedisClient,
    scan_count: i64,
    pipeline_size: usize,
}

impl RedisScanner {
    pub fn new(client: RedisClient, scan_count: i64) -> Self {
        RedisScanner {
            client,
            scan_count,
            pipeline_size: DEFAULT_PIPELINE_SIZE,
        }
    }

    /// Returns active states for one journey.
    pub async fn scan_journey(
        &self,
        cancel: &CancellationToken,
        journey_id: &str,
    ) -> Result<Vec<JourneyState>, RepiqueError> {
        self.scan(cancel, &keys::journey_scan_pattern(journey_id))
            .await
    }

    async fn scan(
        &self,
        cancel: &CancellationToken,
        pattern: &str,
    ) -> Result<Vec<JourneyState>, RepiqueError> {
        let mut states = Vec::new();
        let mut cursor: u64 = 0;
        let mut key_batch: Vec<String> = Vec::with_capacity(self.pipeline_size);

        loop {
            ensure_live(cancel)?;

            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.scan_count);
            let (next_cursor, keys): (u64, Vec<String>) =
                with_cancel(cancel, self.client.query(&cmd)).await?;

            key_batch.extend(keys);

            if key_batch.len() >= self.pipeline_size || next_cursor == 0 {
                match with_cancel(cancel, self.fetch_batch(&key_batch)).await {
                    Ok(batch) => states.extend(batch),
                    Err(e @ RepiqueError::Cancelled) => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            batch_size = key_batch.len(),
                            "failed to fetch key batch"
                        );
                    }
                }
                key_batch.clear();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        tracing::debug!(pattern, count = states.len(), "scan completed");
        Ok(states)
    }

    /// Fetches a key batch with one pipeline round trip.
    async fn fetch_batch(&self, batch: &[String]) -> Result<Vec<JourneyState>, RepiqueError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in batch {
            pipe.get(key);
        }
        let values: Vec<Option<String>> = self.client.query_pipeline(&pipe).await?;
        Ok(decode_batch(batch, values))
    }
}

/// Decodes fetched values, skipping missing and malformed records.
fn decode_batch(batch: &[String], values: Vec<Option<String>>) -> Vec<JourneyState> {
    let mut states = Vec::with_capacity(values.len());
    for (key, value) in batch.iter().zip(values) {
        let Some(data) = value else {
            // Key expired between SCAN and fetch.
            tracing::debug!(%key, "state key vanished before fetch");
            continue;
        };
        match serde_json::from_str::<JourneyState>(&data) {
            Ok(state) => states.push(state),
            Err(e) => {
                tracing::warn!(%key, error = %e, "failed to decode journey state");
            }
        }
    }
    states
}

#[async_trait]
impl JourneyScanner for RedisScanner {
    async fn scan_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<JourneyState>, RepiqueError> {
        self.scan(cancel, keys::STATE_SCAN_PATTERN).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_json(customer: &str) -> String {
        format!(
            r#"{{
                "journey_id": "onboarding-v2",
                "step": "personal-data",
                "customer_number": "{customer}",
                "tenant_id": "tenant-123",
                "contact_id": "contact-456",
                "last_interaction_at": "2026-03-01T12:00:00Z",
                "step_started_at": "2026-03-01T12:00:00Z",
                "journey_started_at": "2026-03-01T12:00:00Z"
            }}"#
        )
    }

    fn batch_keys(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| keys::journey_state_key("onboarding-v2", &format!("55{i}")))
            .collect()
    }

    #[test]
    fn decode_batch_keeps_well_formed_records() {
        let keys = batch_keys(2);
        let values = vec![Some(state_json("550")), Some(state_json("551"))];
        let states = decode_batch(&keys, values);
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].customer_number, "550");
    }

    #[test]
    fn decode_batch_skips_vanished_keys() {
        let keys = batch_keys(3);
        let values = vec![Some(state_json("550")), None, Some(state_json("552"))];
        let states = decode_batch(&keys, values);
        assert_eq!(states.len(), 2);
    }

    #[test]
    fn decode_batch_skips_malformed_records_without_aborting() {
        let keys = batch_keys(3);
        let values = vec![
            Some("{broken".to_string()),
            Some(state_json("551")),
            Some(r#"{"journey_id": 42}"#.to_string()),
        ];
        let states = decode_batch(&keys, values);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].customer_number, "551");
    }

    #[test]
    fn empty_batch_decodes_to_nothing() {
        assert!(decode_batch(&[], Vec::new()).is_empty());
    }
}
