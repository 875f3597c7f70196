// SPDX-FileCopyrightText: 2026 Repique Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure template rendering.
//!
//! The render context is the event metadata merged at the root *and* nested
//! under a `metadata` key, so template bodies may use either `{{field}}` or
//! `{{metadata.field}}`. Bodies are plain chat text; HTML escaping is
//! disabled.

use handlebars::Handlebars;

use repique_core::{Metadata, RepiqueError};

/// Renders a template body against event metadata.
pub fn render(body: &str, metadata: &Metadata) -> Result<String, RepiqueError> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);

    let mut data = serde_json::Map::new();
    data.insert(
        "metadata".to_string(),
        serde_json::Value::Object(metadata.clone()),
    );
    // Root-level merge; a field literally named `metadata` shadows the map.
    for (key, value) in metadata {
        data.insert(key.clone(), value.clone());
    }

    registry
        .render_template(body, &serde_json::Value::Object(data))
        .map_err(|e| RepiqueError::Config(format!("render template: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, serde_json::Value)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn root_level_fields_resolve() {
        let meta = metadata(&[("name", serde_json::json!("Maria"))]);
        let out = render("Hi {{name}}, finish your signup!", &meta).unwrap();
        assert_eq!(out, "Hi Maria, finish your signup!");
    }

    #[test]
    fn metadata_prefixed_fields_resolve() {
        let meta = metadata(&[("name", serde_json::json!("Maria"))]);
        let out = render("Hi {{metadata.name}}!", &meta).unwrap();
        assert_eq!(out, "Hi Maria!");
    }

    #[test]
    fn both_access_styles_in_one_body() {
        let meta = metadata(&[
            ("name", serde_json::json!("Maria")),
            ("plan", serde_json::json!("premium")),
        ]);
        let out = render("{{name}} picked {{metadata.plan}}", &meta).unwrap();
        assert_eq!(out, "Maria picked premium");
    }

    #[test]
    fn missing_fields_render_empty() {
        let out = render("Hi {{absent}}!", &Metadata::new()).unwrap();
        assert_eq!(out, "Hi !");
    }

    #[test]
    fn chat_text_is_not_html_escaped() {
        let meta = metadata(&[("name", serde_json::json!("Dias & Filhos <Ltda>"))]);
        let out = render("{{name}}", &meta).unwrap();
        assert_eq!(out, "Dias & Filhos <Ltda>");
    }

    #[test]
    fn numeric_values_render() {
        let meta = metadata(&[("days_left", serde_json::json!(3))]);
        let out = render("{{days_left}} days left", &meta).unwrap();
        assert_eq!(out, "3 days left");
    }

    #[test]
    fn malformed_template_is_an_error() {
        let err = render("Hi {{#if}}", &Metadata::new()).unwrap_err();
        assert!(err.to_string().contains("render template"), "got: {err}");
    }
}
