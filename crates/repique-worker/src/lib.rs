// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recovery worker for the repique engine.
//!
//! The pipeline of one run: [`orchestrator`] scans and groups active
//! states, [`processor`] applies the idempotent dispatch protocol to each
//! one, and [`evaluator`] decides which rule, if any, fires. [`shutdown`]
//! wires process signals into the ambient cancellation token.

pub mod evaluator;
pub mod orchestrator;
pub mod processor;
pub mod shutdown;

pub use evaluator::{evaluate_rule, select_triggered_rule, Evaluation};
pub use orchestrator::{Orchestrator, RunSummary};
pub use processor::Processor;
