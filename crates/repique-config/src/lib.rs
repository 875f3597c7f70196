// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the repique recovery engine.
//!
//! Three layers: process settings from environment variables ([`app`]),
//! per-journey recovery documents fetched from a read-only HTTP source and
//! cached ([`journey`], [`loader`]), and message template documents
//! ([`templates`]). The [`secrets`] module is the seam to the external
//! secret vault.

pub mod app;
pub mod journey;
pub mod loader;
pub mod secrets;
pub mod templates;

pub use app::{debug_enabled, StoreSettings, TrackerSettings, WhatsAppSettings, WorkerSettings};
pub use journey::{GlobalConfig, JourneyConfig, RecoveryRule, StepConfig};
pub use loader::{ConfigLoader, JourneyConfigSource};
pub use secrets::{CredentialSource, EnvCredentialSource, WhatsAppCredentials};
pub use templates::{
    build_template_ref, parse_template_ref, TemplateConfig, TemplateRef, TemplateStore,
};
