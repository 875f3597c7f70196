// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Journey configuration model.
//!
//! One YAML document per journey: a global budget section plus per-step
//! recovery rules. Validation happens at load time and fails loudly; the
//! dispatch path never sees an invalid document.

use serde::{Deserialize, Serialize};

use repique_core::RepiqueError;

/// Configuration for one journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyConfig {
    pub journey: String,
    pub global: GlobalConfig,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// Journey-wide recovery budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub enabled: bool,
    pub max_total_attempts: u32,
    pub min_interval_between_attempts_minutes: u32,
}

/// One step within a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,
    #[serde(default)]
    pub recovery_rules: Vec<RecoveryRule>,
}

/// A named timing condition paired with a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRule {
    pub name: String,
    pub enabled: bool,
    pub inactive_minutes: u32,
    pub max_attempts: u32,
    pub template: String,
}

impl JourneyConfig {
    /// Finds a step by name.
    pub fn find_step(&self, name: &str) -> Option<&StepConfig> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Validates the document. Collects every problem instead of failing
    /// fast so a broken config is fixable in one pass.
    pub fn validate(&self) -> Result<(), RepiqueError> {
        let mut errors = Vec::new();

        if self.journey.trim().is_empty() {
            errors.push("journey is required".to_string());
        }
        if self.global.max_total_attempts == 0 {
            errors.push("global.max_total_attempts must be positive".to_string());
        }
        if self.global.min_interval_between_attempts_minutes == 0 {
            errors.push(
                "global.min_interval_between_attempts_minutes must be positive".to_string(),
            );
        }

        for (i, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                errors.push(format!("steps[{i}].name is required"));
            }
            for (j, rule) in step.recovery_rules.iter().enumerate() {
                if rule.name.trim().is_empty() {
                    errors.push(format!("steps[{i}].recovery_rules[{j}].name is required"));
                }
                if rule.inactive_minutes == 0 {
                    errors.push(format!(
                        "steps[{i}].recovery_rules[{j}].inactive_minutes must be positive"
                    ));
                }
                if rule.max_attempts == 0 {
                    errors.push(format!(
                        "steps[{i}].recovery_rules[{j}].max_attempts must be positive"
                    ));
                }
                if rule.template.trim().is_empty() {
                    errors.push(format!(
                        "steps[{i}].recovery_rules[{j}].template is required"
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RepiqueError::Config(format!(
                "journey config validation failed: {}",
                errors.join("; ")
            )))
        }
    }
}
