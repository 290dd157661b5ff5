//! Client configuration types for LSP integration.
//!
//! Editors push the `yaml` settings section through
//! `workspace/didChangeConfiguration`. Every field is optional so a partial
//! update only overrides what it names; everything else keeps the value from
//! `.yamlsense.toml` or an earlier update.

use serde::Deserialize;
use serde_json::Value;
use yamlsense_core::{SchemaList, Settings};

/// Settings section the server reads from configuration payloads.
pub const SETTINGS_SECTION: &str = "yaml";

/// `yaml` settings received from the client.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientSettings {
    /// Publish validation diagnostics
    pub validate: Option<bool>,

    /// Answer hover requests
    pub hover: Option<bool>,

    /// Answer completion requests
    pub completion: Option<bool>,

    /// Static schema associations; replaces the current list when present
    pub schemas: Option<SchemaList>,
}

impl ClientSettings {
    /// Extract the `yaml` section from a `didChangeConfiguration` payload.
    ///
    /// Accepts both `{ "yaml": { ... } }` and a bare section. Returns `None`
    /// when the payload does not deserialize.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let section = payload.get(SETTINGS_SECTION).unwrap_or(payload);
        serde_json::from_value(section.clone()).ok()
    }

    /// Apply the fields present in this update on top of `settings`.
    pub fn merge_into_settings(&self, settings: &mut Settings) {
        if let Some(v) = self.validate {
            settings.validate = v;
        }
        if let Some(v) = self.hover {
            settings.hover = v;
        }
        if let Some(v) = self.completion {
            settings.completion = v;
        }
        if let Some(ref schemas) = self.schemas {
            settings.schemas = schemas.0.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yamlsense_core::{FileMatch, SchemaSetting};

    #[test]
    fn test_client_settings_deserialization_complete() {
        let payload = json!({
            "yaml": {
                "validate": false,
                "hover": true,
                "completion": false,
                "schemas": [
                    { "url": "kubernetes", "fileMatch": ["k8s/*.yaml"] },
                    { "fileMatch": "ci.yaml", "schema": { "type": "object" } }
                ]
            }
        });

        let config = ClientSettings::from_payload(&payload).expect("should parse");

        assert_eq!(config.validate, Some(false));
        assert_eq!(config.hover, Some(true));
        assert_eq!(config.completion, Some(false));
        let schemas = config.schemas.expect("schemas should be present").0;
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].url.as_deref(), Some("kubernetes"));
        assert_eq!(
            schemas[1].file_match,
            Some(FileMatch::One("ci.yaml".to_string()))
        );
    }

    #[test]
    fn test_schemas_object_form() {
        let payload = json!({
            "schemas": {
                "https://json.schemastore.org/github-workflow.json": ".github/workflows/*.yml",
                "kubernetes": ["a.yaml", "b.yaml"]
            }
        });

        let config = ClientSettings::from_payload(&payload).expect("should parse");
        let schemas = config.schemas.expect("schemas").0;

        assert_eq!(schemas.len(), 2);
        assert_eq!(
            schemas[0].url.as_deref(),
            Some("https://json.schemastore.org/github-workflow.json")
        );
        assert_eq!(schemas[1].patterns(), vec!["a.yaml", "b.yaml"]);
    }

    #[test]
    fn test_client_settings_deserialization_empty() {
        let config = ClientSettings::from_payload(&json!({})).expect("should parse");

        assert!(config.validate.is_none());
        assert!(config.hover.is_none());
        assert!(config.completion.is_none());
        assert!(config.schemas.is_none());
    }

    #[test]
    fn test_invalid_payload_is_rejected() {
        assert!(ClientSettings::from_payload(&json!({ "yaml": { "validate": "yes" } })).is_none());
    }

    #[test]
    fn test_merge_preserves_unspecified() {
        let mut settings = Settings {
            hover: false,
            schemas: vec![SchemaSetting::new("kubernetes", &["*.yaml"])],
            ..Settings::default()
        };

        let update = ClientSettings {
            validate: Some(false),
            ..Default::default()
        };
        update.merge_into_settings(&mut settings);

        assert!(!settings.validate);
        assert!(!settings.hover);
        assert!(settings.completion);
        assert_eq!(settings.schemas.len(), 1);
    }

    #[test]
    fn test_merge_replaces_schemas() {
        let mut settings = Settings {
            schemas: vec![SchemaSetting::new("kubernetes", &["*.yaml"])],
            ..Settings::default()
        };

        let update = ClientSettings {
            schemas: Some(SchemaList(Vec::new())),
            ..Default::default()
        };
        update.merge_into_settings(&mut settings);

        assert!(settings.schemas.is_empty());
    }
}
