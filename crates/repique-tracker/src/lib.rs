// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event tracker for the repique recovery engine.
//!
//! Receives journey events over HTTP and maintains the shared state the
//! recovery worker scans. Two endpoints: `POST /journey/event` upserts a
//! customer's position, `POST /journey/finish` deletes it.

pub mod handlers;
pub mod server;
pub mod tracker;

pub use server::{router, serve, TrackerState};
pub use tracker::{EventRequest, FinishRequest, Tracker};
