// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for the repique workspace.
//!
//! [`MemoryStateStore`] mirrors the Redis store's observable semantics;
//! [`RecordingMessenger`] captures outbound messages. Both support failure
//! injection so pipeline error paths are testable without a network.

pub mod memory_store;
pub mod recording_messenger;

pub use memory_store::MemoryStateStore;
pub use recording_messenger::RecordingMessenger;
