// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the seams between the pipeline and its backends.

pub mod messenger;
pub mod scanner;
pub mod store;

pub use messenger::Messenger;
pub use scanner::JourneyScanner;
pub use store::StateStore;
