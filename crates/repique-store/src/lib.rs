// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed state store for the repique recovery engine.
//!
//! The [`RedisClient`] supports single-node, cluster, and sentinel
//! topologies; [`RedisStateStore`] implements the typed state operations and
//! [`RedisScanner`] the cursor-based key enumeration the worker runs on.

pub mod client;
pub mod scanner;
pub mod state_store;

pub use client::{RedisClient, RedisSettings};
pub use scanner::{RedisScanner, DEFAULT_PIPELINE_SIZE, DEFAULT_SCAN_COUNT};
pub use state_store::{RedisStateStore, MESSAGE_LOCK_TTL};
