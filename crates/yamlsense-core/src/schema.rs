//! Schema association resolution.
//!
//! Schema associations come from two places: the client's
//! `json/schemaAssociations` notification (pattern → schema URIs) and the
//! static `schemas` settings. [`SchemaResolver::resolve`] merges both into the
//! ordered list of [`SchemaConfigEntry`] handed to the language service, and
//! remembers which file patterns were routed to the Kubernetes schema.

use std::path::{Component, Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::SchemaSetting;
use crate::matcher::{PatternMatcher, matches_any};

/// Schema URL substituted for the `kubernetes` shorthand.
pub const KUBERNETES_SCHEMA_URL: &str = "https://gist.githubusercontent.com/JPinkney/ccaf3909ef811e5657ca2e2e1fa05d76/raw/f85e51bfb67fdb99ab7653c2953b60087cc871ea/openshift_schema_all.json";

/// Prefix of the placeholder URIs given to inline schemas without an id.
pub const CUSTOM_SCHEMA_PREFIX: &str = "yamlsense://schemas/custom/";

/// Dynamic associations: file pattern → schema URIs.
pub type SchemaAssociations = IndexMap<String, Vec<String>>;

/// One effective schema association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfigEntry {
    pub uri: String,
    /// Never empty
    pub file_match: Vec<String>,
    pub schema: Option<serde_json::Value>,
}

/// Resolves schema associations and tracks Kubernetes-routed patterns.
#[derive(Debug, Default)]
pub struct SchemaResolver {
    kubernetes_patterns: IndexSet<String>,
}

impl SchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge dynamic associations and static settings.
    ///
    /// Dynamic entries come first, in notification order, followed by static
    /// entries in settings order. Settings that yield no URI or no file
    /// pattern are skipped. The Kubernetes pattern set is rebuilt from
    /// scratch on every call.
    pub fn resolve(
        &mut self,
        associations: Option<&SchemaAssociations>,
        settings: &[SchemaSetting],
        workspace_root: Option<&Path>,
    ) -> Vec<SchemaConfigEntry> {
        self.kubernetes_patterns.clear();
        let mut entries = Vec::new();

        for (pattern, uris) in associations.into_iter().flatten() {
            for uri in uris {
                entries.push(SchemaConfigEntry {
                    uri: uri.clone(),
                    file_match: vec![pattern.clone()],
                    schema: None,
                });
            }
        }

        for setting in settings {
            let file_match = setting.patterns();
            if file_match.is_empty() {
                continue;
            }
            let Some(uri) = effective_uri(setting, &file_match, workspace_root) else {
                continue;
            };
            entries.push(SchemaConfigEntry {
                uri,
                file_match,
                schema: setting.schema.clone(),
            });
        }

        for entry in &entries {
            if entry.uri == KUBERNETES_SCHEMA_URL {
                self.kubernetes_patterns
                    .extend(entry.file_match.iter().cloned());
            }
        }

        entries
    }

    /// File patterns currently routed to the Kubernetes schema.
    pub fn kubernetes_patterns(&self) -> &IndexSet<String> {
        &self.kubernetes_patterns
    }

    /// True if `uri` matches any Kubernetes-routed pattern.
    pub fn is_kubernetes<M>(&self, matcher: &M, uri: &str) -> bool
    where
        M: PatternMatcher + ?Sized,
    {
        matches_any(matcher, &self.kubernetes_patterns, uri)
    }
}

/// Work out the URI a static setting stands for.
fn effective_uri(
    setting: &SchemaSetting,
    file_match: &[String],
    workspace_root: Option<&Path>,
) -> Option<String> {
    let mut uri = setting
        .url
        .clone()
        .filter(|url| !url.is_empty())
        .or_else(|| setting.schema.as_ref().and_then(schema_id))
        .unwrap_or_else(|| synthesized_uri(file_match));

    if uri.starts_with('.') {
        if let Some(root) = workspace_root {
            uri = Url::from_file_path(normalize_path(&root.join(&uri)))
                .map(String::from)
                .ok()?;
        }
    }

    if uri.eq_ignore_ascii_case("kubernetes") {
        uri = KUBERNETES_SCHEMA_URL.to_string();
    }

    Some(uri)
}

/// The identifier an inline schema declares for itself.
fn schema_id(schema: &serde_json::Value) -> Option<String> {
    ["$id", "id"]
        .iter()
        .find_map(|key| schema.get(*key).and_then(serde_json::Value::as_str))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Placeholder URI for an anonymous inline schema. Settings with identical
/// file patterns map to the same URI.
fn synthesized_uri(file_match: &[String]) -> String {
    let joined = file_match.join("&");
    let encoded: String = url::form_urlencoded::byte_serialize(joined.as_bytes()).collect();
    format!("{CUSTOM_SCHEMA_PREFIX}{encoded}")
}

/// Lexically resolve `.` and `..` components.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
