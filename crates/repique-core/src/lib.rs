// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the repique recovery engine.
//!
//! This crate holds the domain model shared by the event tracker and the
//! recovery worker: journey state and history types, the error taxonomy, the
//! bit-exact key layout of the state store, cancellation plumbing, and the
//! adapter traits the pipeline is written against.

pub mod cancel;
pub mod error;
pub mod journey;
pub mod keys;
pub mod traits;

pub use cancel::{ensure_live, with_cancel};
pub use error::RepiqueError;
pub use journey::{JourneyState, Metadata, RecoveryMessage, RepiqueEntry, RepiqueHistory};
pub use traits::{JourneyScanner, Messenger, StateStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_taxonomy_is_constructible() {
        let _not_found = RepiqueError::NotFound;
        let _validation = RepiqueError::Validation("journey_id is required".into());
        let _transport = RepiqueError::Transport {
            message: "redis unreachable".into(),
            source: None,
        };
        let _serialization = RepiqueError::Serialization {
            message: "invalid json".into(),
            source: None,
        };
        let _config = RepiqueError::Config("journey is required".into());
        let _messaging = RepiqueError::Messaging {
            customer_number: "5511999".into(),
            template_ref: "cfg:step:key".into(),
            source: Box::new(std::io::Error::other("io")),
        };
        let _journey = RepiqueError::journey("j", "c", "SaveState", RepiqueError::NotFound);
        let _cancelled = RepiqueError::Cancelled;
    }

    #[test]
    fn adapter_traits_are_object_safe() {
        fn _store(_: &dyn StateStore) {}
        fn _scanner(_: &dyn JourneyScanner) {}
        fn _messenger(_: &dyn Messenger) {}
    }
}
