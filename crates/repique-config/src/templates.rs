// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message template documents and references.
//!
//! Templates are organized per journey as `step -> template_key -> body` and
//! addressed by a `config_name:step:template_key` reference. The reference
//! is split on the *last* two colons so the config name may itself contain
//! colons.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use repique_core::RepiqueError;

use crate::loader::{build_http_client, fetch_profile};

/// Template document for one journey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub templates: HashMap<String, HashMap<String, String>>,
}

impl TemplateConfig {
    /// Looks up a template body by step and key.
    pub fn body(&self, step_name: &str, template_key: &str) -> Option<&str> {
        self.templates
            .get(step_name)
            .and_then(|step| step.get(template_key))
            .map(String::as_str)
    }
}

/// A parsed `config_name:step:template_key` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef<'a> {
    pub config_name: &'a str,
    pub step_name: &'a str,
    pub template_key: &'a str,
}

/// Parses a template reference, splitting on the last two colons.
pub fn parse_template_ref(reference: &str) -> Result<TemplateRef<'_>, RepiqueError> {
    let invalid = || {
        RepiqueError::Config(format!(
            "invalid template reference format: {reference} (expected 'config:step:template')"
        ))
    };

    let (head, template_key) = reference.rsplit_once(':').ok_or_else(invalid)?;
    let (config_name, step_name) = head.rsplit_once(':').ok_or_else(invalid)?;

    Ok(TemplateRef {
        config_name,
        step_name,
        template_key,
    })
}

/// Builds the reference for a rule firing on a journey step.
pub fn build_template_ref(journey_id: &str, step_name: &str, template_key: &str) -> String {
    format!("journey.{journey_id}.templates:{step_name}:{template_key}")
}

/// HTTP-backed, process-wide template document cache.
///
/// Same population discipline as the journey cache: shared reads,
/// double-checked exclusive writes, failures never cached.
pub struct TemplateStore {
    http: reqwest::Client,
    endpoint: String,
    cache: RwLock<HashMap<String, Arc<TemplateConfig>>>,
}

impl TemplateStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RepiqueError> {
        Ok(TemplateStore {
            http: build_http_client()?,
            endpoint: endpoint.into(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Loads (or returns the cached) template document `config_name`.
    pub async fn load(
        &self,
        cancel: &CancellationToken,
        config_name: &str,
    ) -> Result<Arc<TemplateConfig>, RepiqueError> {
        if let Some(cached) = self.cache.read().await.get(config_name) {
            return Ok(cached.clone());
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.get(config_name) {
            return Ok(cached.clone());
        }

        let data = fetch_profile(&self.http, &self.endpoint, config_name, cancel).await?;
        let config: TemplateConfig = serde_yaml::from_str(&data).map_err(|e| {
            RepiqueError::Config(format!("parse template config {config_name}: {e}"))
        })?;

        let config = Arc::new(config);
        cache.insert(config_name.to_string(), config.clone());
        tracing::debug!(config_name, "loaded template config");

        Ok(config)
    }

    /// Drops every cached document.
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }
}
