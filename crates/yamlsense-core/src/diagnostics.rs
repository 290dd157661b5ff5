//! Diagnostic types, engine errors, and diagnostic normalization

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::Range;

pub type EngineResult<T> = Result<T, EngineError>;

/// A problem reported against a document range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    pub message: String,
    pub source: Option<String>,
    /// Schema the problem was reported against, if any
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl Diagnostic {
    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            message: message.into(),
            source: Some("yamlsense".to_string()),
            schema: None,
        }
    }

    pub fn warning(range: Range, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(range, message)
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Post-process raw validation output before it is published.
///
/// Every diagnostic is reported as an error, whatever severity the engine
/// assigned. Exact duplicates (same range, message and severity) are dropped,
/// keeping the first occurrence in place.
pub fn normalize_diagnostics(raw: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|mut diag| {
            diag.severity = Severity::Error;
            diag
        })
        .filter(|diag| seen.insert((diag.range, diag.message.clone(), diag.severity)))
        .collect()
}

/// Errors raised by the language engine and its collaborators
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to fetch schema {uri}: {message}")]
    SchemaFetch { uri: String, message: String },

    #[error("Schema {uri} is not valid JSON")]
    SchemaParse {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Schema {uri} could not be compiled: {message}")]
    SchemaCompile { uri: String, message: String },

    #[error("Unsupported schema URI scheme: {uri}")]
    UnsupportedScheme { uri: String },

    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Range;

    #[test]
    fn test_normalize_removes_duplicates_and_preserves_order() {
        let first = Diagnostic::error(Range::on_line(0, 0, 3), "Missing property");
        let duplicate = first.clone();
        let other = Diagnostic::error(Range::on_line(2, 0, 3), "Missing property");

        let normalized = normalize_diagnostics(vec![first.clone(), duplicate, other.clone()]);

        assert_eq!(normalized, vec![first, other]);
    }

    #[test]
    fn test_normalize_promotes_every_severity_to_error() {
        let raw = vec![
            Diagnostic::warning(Range::on_line(0, 0, 1), "a"),
            Diagnostic {
                severity: Severity::Hint,
                ..Diagnostic::error(Range::on_line(1, 0, 1), "b")
            },
            Diagnostic {
                severity: Severity::Information,
                ..Diagnostic::error(Range::on_line(2, 0, 1), "c")
            },
        ];

        let normalized = normalize_diagnostics(raw);

        assert_eq!(normalized.len(), 3);
        assert!(normalized.iter().all(|d| d.severity == Severity::Error));
    }

    #[test]
    fn test_normalize_dedups_after_severity_coercion() {
        let range = Range::on_line(4, 2, 6);
        let raw = vec![
            Diagnostic::warning(range, "Incorrect type"),
            Diagnostic::error(range, "Incorrect type"),
        ];

        assert_eq!(normalize_diagnostics(raw).len(), 1);
    }

    #[test]
    fn test_normalize_empty_input() {
        assert!(normalize_diagnostics(Vec::new()).is_empty());
    }
}
