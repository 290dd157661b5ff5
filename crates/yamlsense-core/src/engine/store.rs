//! Schema bodies and compiled validators, keyed by schema URI.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use indexmap::IndexSet;
use serde_json::Value;
use url::Url;

use super::navigate::narrow_for_kind;
use crate::diagnostics::{EngineError, EngineResult};
use crate::matcher::{PatternMatcher, matches_any};
use crate::schema::SchemaConfigEntry;

/// Loads the raw text of a schema.
pub trait SchemaFetcher: Send + Sync {
    fn fetch(&self, uri: &str) -> EngineResult<String>;
}

/// Reads `file:` schemas from disk and, with the `remote-schemas` feature,
/// downloads `http(s):` schemas.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFetcher;

impl SchemaFetcher for DefaultFetcher {
    fn fetch(&self, uri: &str) -> EngineResult<String> {
        let url = Url::parse(uri).map_err(|_| EngineError::UnsupportedScheme {
            uri: uri.to_string(),
        })?;

        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| EngineError::UnsupportedScheme {
                        uri: uri.to_string(),
                    })?;
                std::fs::read_to_string(&path).map_err(|e| EngineError::SchemaFetch {
                    uri: uri.to_string(),
                    message: e.to_string(),
                })
            }
            #[cfg(feature = "remote-schemas")]
            "http" | "https" => fetch_remote(uri),
            _ => Err(EngineError::UnsupportedScheme {
                uri: uri.to_string(),
            }),
        }
    }
}

#[cfg(feature = "remote-schemas")]
fn fetch_remote(uri: &str) -> EngineResult<String> {
    let fetch_error = |e: reqwest::Error| EngineError::SchemaFetch {
        uri: uri.to_string(),
        message: e.to_string(),
    };
    reqwest::blocking::get(uri)
        .and_then(reqwest::blocking::Response::error_for_status)
        .and_then(reqwest::blocking::Response::text)
        .map_err(fetch_error)
}

type ValidatorKey = (String, Option<String>);

/// Configured schema entries plus caches of fetched bodies and compiled
/// validators.
///
/// Inline schemas from the configuration win over fetched ones. Compiled
/// validators are keyed by schema URI and, for Kubernetes documents, the
/// resource `kind` they were narrowed to.
pub struct SchemaStore {
    fetcher: Arc<dyn SchemaFetcher>,
    entries: RwLock<Vec<SchemaConfigEntry>>,
    bodies: Mutex<HashMap<String, Arc<Value>>>,
    validators: Mutex<HashMap<ValidatorKey, Arc<jsonschema::Validator>>>,
}

impl SchemaStore {
    pub fn new(fetcher: Arc<dyn SchemaFetcher>) -> Self {
        Self {
            fetcher,
            entries: RwLock::new(Vec::new()),
            bodies: Mutex::new(HashMap::new()),
            validators: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the schema configuration.
    pub fn configure(&self, entries: &[SchemaConfigEntry]) {
        *self.entries.write().unwrap_or_else(|e| e.into_inner()) = entries.to_vec();
        self.validators
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// URIs of every configured schema whose patterns match `document_uri`,
    /// in configuration order.
    pub fn matching(&self, document_uri: &str, matcher: &dyn PatternMatcher) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let uris: IndexSet<&str> = entries
            .iter()
            .filter(|entry| matches_any(matcher, &entry.file_match, document_uri))
            .map(|entry| entry.uri.as_str())
            .collect();
        uris.into_iter().map(str::to_string).collect()
    }

    /// Schema body for `uri`.
    pub fn load(&self, uri: &str) -> EngineResult<Arc<Value>> {
        if let Some(inline) = self.inline_schema(uri) {
            return Ok(inline);
        }

        if let Some(cached) = self
            .bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(uri)
        {
            return Ok(Arc::clone(cached));
        }

        let text = self.fetcher.fetch(uri)?;
        let body: Value = serde_json::from_str(&text).map_err(|source| EngineError::SchemaParse {
            uri: uri.to_string(),
            source,
        })?;
        let body = Arc::new(body);
        tracing::debug!(schema = uri, "schema loaded");

        self.bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uri.to_string(), Arc::clone(&body));
        Ok(body)
    }

    /// Compiled validator for `uri`, narrowed to `kind` when given.
    pub fn validator(&self, uri: &str, kind: Option<&str>) -> EngineResult<Arc<jsonschema::Validator>> {
        let key = (uri.to_string(), kind.map(str::to_string));
        if let Some(cached) = self
            .validators
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Ok(Arc::clone(cached));
        }

        let body = self.load(uri)?;
        let schema = match kind {
            Some(kind) => narrow_for_kind(&body, kind),
            None => std::borrow::Cow::Borrowed(body.as_ref()),
        };

        let validator = jsonschema::options()
            .with_retriever(FetcherRetriever {
                fetcher: Arc::clone(&self.fetcher),
            })
            .build(&schema)
            .map_err(|e| EngineError::SchemaCompile {
                uri: uri.to_string(),
                message: e.to_string(),
            })?;
        let validator = Arc::new(validator);

        self.validators
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, Arc::clone(&validator));
        Ok(validator)
    }

    /// Forget the cached body of `uri`. Returns true if one was dropped.
    pub fn invalidate(&self, uri: &str) -> bool {
        let removed = self
            .bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(uri)
            .is_some();
        if removed {
            // Compiled validators may embed the body through a `$ref`.
            self.validators
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clear();
        }
        removed
    }

    fn inline_schema(&self, uri: &str) -> Option<Arc<Value>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .find(|entry| entry.uri == uri)
            .and_then(|entry| entry.schema.clone())
            .map(Arc::new)
    }
}

/// Resolves external `$ref`s through the store's fetcher.
struct FetcherRetriever {
    fetcher: Arc<dyn SchemaFetcher>,
}

impl jsonschema::Retrieve for FetcherRetriever {
    fn retrieve(
        &self,
        uri: &jsonschema::Uri<String>,
    ) -> Result<Value, Box<dyn core::error::Error + Send + Sync>> {
        let text = self.fetcher.fetch(uri.as_str())?;
        Ok(serde_json::from_str(&text)?)
    }
}
