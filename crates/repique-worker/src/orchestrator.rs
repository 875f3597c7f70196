// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run-once worker entry point.
//!
//! One run: scan every active state, group by journey, resolve each group's
//! configuration, and hand states to the processor one at a time. Per-state
//! failures are logged and counted, never fatal; the run only aborts on
//! scanner failure or cancellation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info};

use repique_config::JourneyConfigSource;
use repique_core::{ensure_live, JourneyScanner, JourneyState, RepiqueError};
use tokio_util::sync::CancellationToken;

use crate::processor::Processor;

/// Outcome counts for one worker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Distinct journey ids seen in the scan.
    pub journey_types: usize,
    /// States yielded by the scan.
    pub total_sessions: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Drives one full scan-and-dispatch pass.
pub struct Orchestrator {
    scanner: Arc<dyn JourneyScanner>,
    config_source: Arc<dyn JourneyConfigSource>,
    processor: Processor,
}

impl Orchestrator {
    pub fn new(
        scanner: Arc<dyn JourneyScanner>,
        config_source: Arc<dyn JourneyConfigSource>,
        processor: Processor,
    ) -> Self {
        Orchestrator {
            scanner,
            config_source,
            processor,
        }
    }

    /// Executes one run and reports the outcome counts.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary, RepiqueError> {
        info!("starting worker run");

        let states = self.scanner.scan_all(cancel).await?;
        info!(count = states.len(), "scanned journeys");

        if states.is_empty() {
            info!(
                journey_types = 0,
                total_sessions = 0,
                processed = 0,
                skipped = 0,
                errors = 0,
                "worker run completed"
            );
            return Ok(RunSummary::default());
        }

        let mut summary = RunSummary {
            total_sessions: states.len(),
            ..RunSummary::default()
        };

        let grouped = group_by_journey(states);
        summary.journey_types = grouped.len();

        for (journey_id, group) in &grouped {
            let config = match self.config_source.load_journey(cancel, journey_id).await {
                Ok(config) => config,
                Err(e) => {
                    error!(%journey_id, error = %e, "failed to load journey config");
                    summary.errors += group.len();
                    continue;
                }
            };

            if !config.global.enabled {
                debug!(
                    %journey_id,
                    state_count = group.len(),
                    "journey disabled, skipping all states"
                );
                summary.skipped += group.len();
                continue;
            }

            for state in group {
                ensure_live(cancel)?;

                match self.processor.process_journey(cancel, &config, state).await {
                    Ok(()) => summary.processed += 1,
                    Err(e @ RepiqueError::Cancelled) => return Err(e),
                    Err(e) => {
                        error!(
                            journey_id = %state.journey_id,
                            customer_number = %state.customer_number,
                            error = %e,
                            "failed to process journey"
                        );
                        summary.errors += 1;
                    }
                }
            }
        }

        info!(
            journey_types = summary.journey_types,
            total_sessions = summary.total_sessions,
            processed = summary.processed,
            skipped = summary.skipped,
            errors = summary.errors,
            "worker run completed"
        );

        Ok(summary)
    }
}

fn group_by_journey(states: Vec<JourneyState>) -> HashMap<String, Vec<JourneyState>> {
    let mut grouped: HashMap<String, Vec<JourneyState>> = HashMap::new();
    for state in states {
        grouped.entry(state.journey_id.clone()).or_default().push(state);
    }
    grouped
}
