//! Language server settings

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::diagnostics::{EngineError, EngineResult};

/// Name of the optional per-workspace settings file.
pub const CONFIG_FILE_NAME: &str = ".yamlsense.toml";

/// Settings for the YAML language features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Publish validation diagnostics
    #[serde(default = "default_true")]
    pub validate: bool,

    /// Answer hover requests
    #[serde(default = "default_true")]
    pub hover: bool,

    /// Answer completion requests
    #[serde(default = "default_true")]
    pub completion: bool,

    /// Static schema associations, in priority order
    #[serde(default, deserialize_with = "deserialize_schemas")]
    pub schemas: Vec<SchemaSetting>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            validate: true,
            hover: true,
            completion: true,
            schemas: Vec::new(),
        }
    }
}

/// Helper function for serde default
fn default_true() -> bool {
    true
}

/// One static schema association as written in settings.
///
/// Every field is optional; entries that end up without a usable URI or
/// without any file pattern are ignored during resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSetting {
    #[serde(default)]
    pub file_match: Option<FileMatch>,

    #[serde(default)]
    pub url: Option<String>,

    /// Inline schema body
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
}

impl SchemaSetting {
    pub fn new(url: impl Into<String>, patterns: &[&str]) -> Self {
        Self {
            file_match: Some(FileMatch::Many(
                patterns.iter().map(|p| (*p).to_string()).collect(),
            )),
            url: Some(url.into()),
            schema: None,
        }
    }

    /// File patterns with the single-pattern form wrapped into a list.
    pub fn patterns(&self) -> Vec<String> {
        self.file_match
            .as_ref()
            .map(FileMatch::to_vec)
            .unwrap_or_default()
    }
}

/// A file pattern, or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileMatch {
    One(String),
    Many(Vec<String>),
}

impl FileMatch {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            FileMatch::One(pattern) => vec![pattern.clone()],
            FileMatch::Many(patterns) => patterns.clone(),
        }
    }
}

/// `schemas` accepts either a list of records or the shorthand
/// `{ "<url>": "<pattern>" | ["<pattern>", ...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SchemasInput {
    List(Vec<SchemaSetting>),
    Map(IndexMap<String, FileMatch>),
}

fn deserialize_schemas<'de, D>(deserializer: D) -> Result<Vec<SchemaSetting>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match SchemasInput::deserialize(deserializer)? {
        SchemasInput::List(list) => list,
        SchemasInput::Map(map) => map
            .into_iter()
            .map(|(url, file_match)| SchemaSetting {
                file_match: Some(file_match),
                url: Some(url),
                schema: None,
            })
            .collect(),
    })
}

/// A `schemas` value in either accepted form, for partial settings updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaList(pub Vec<SchemaSetting>);

impl<'de> Deserialize<'de> for SchemaList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_schemas(deserializer).map(SchemaList)
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| EngineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `.yamlsense.toml` from a workspace root.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load_from_workspace(root: &Path) -> EngineResult<Option<Self>> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }
}
