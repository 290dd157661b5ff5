//! Session state for one language server connection.
//!
//! The [`Session`] owns the open documents, the parse cache, the schema
//! resolver and the current settings. Document events schedule debounced
//! validation runs; results go out through a [`DiagnosticsSink`] as a full
//! replacement set per document.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tower_lsp::lsp_types::Url;
use tracing::{debug, info, warn};
use yamlsense_core::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use yamlsense_core::engine::DefaultFetcher;
use yamlsense_core::{
    CompletionList, Diagnostic, DocumentSymbol, EngineResult, GlobMatcher, HoverInfo,
    LanguageService, ParseCache, PatternMatcher, Position, SchemaAssociations,
    SchemaLanguageService, SchemaResolver, Settings, StructuralParser, TextDocument, YamlDocument,
    YamlParser, normalize_diagnostics, repair_completion_context,
};

use crate::debounce::ValidationScheduler;

/// Receives published diagnostics. The server forwards them to the client.
#[tower_lsp::async_trait]
pub trait DiagnosticsSink: Send + Sync + 'static {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>);
}

/// Tuning knobs for a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Quiet period before a changed document is validated
    pub debounce: Duration,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
            cache_capacity: DEFAULT_CAPACITY,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

/// The language engine a session drives.
pub struct Engine {
    pub parser: Arc<dyn StructuralParser>,
    pub service: Arc<dyn LanguageService>,
    pub matcher: Arc<dyn PatternMatcher>,
}

impl Default for Engine {
    fn default() -> Self {
        let matcher: Arc<dyn PatternMatcher> = Arc::new(GlobMatcher);
        Self {
            parser: Arc::new(YamlParser),
            service: Arc::new(SchemaLanguageService::new(
                Arc::new(DefaultFetcher),
                Arc::clone(&matcher),
            )),
            matcher,
        }
    }
}

struct State {
    sink: Arc<dyn DiagnosticsSink>,
    engine: Engine,
    documents: RwLock<HashMap<Url, TextDocument>>,
    cache: Mutex<ParseCache<YamlDocument>>,
    resolver: RwLock<SchemaResolver>,
    settings: RwLock<Settings>,
    associations: RwLock<Option<SchemaAssociations>>,
    workspace_root: RwLock<Option<PathBuf>>,
    /// Latest scheduled validation run per open document
    runs: Mutex<HashMap<Url, u64>>,
    next_run: AtomicU64,
}

/// Mutable state of a language server connection.
///
/// Built with [`Session::new`] and torn down with [`Session::shutdown`].
pub struct Session {
    state: Arc<State>,
    scheduler: ValidationScheduler,
}

impl Session {
    /// Session with the default `serde_yaml` + `jsonschema` engine.
    pub fn new(options: SessionOptions, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self::with_engine(options, sink, Engine::default())
    }

    pub fn with_engine(
        options: SessionOptions,
        sink: Arc<dyn DiagnosticsSink>,
        engine: Engine,
    ) -> Self {
        Self {
            state: Arc::new(State {
                sink,
                engine,
                documents: RwLock::new(HashMap::new()),
                cache: Mutex::new(ParseCache::new(options.cache_capacity, options.cache_ttl)),
                resolver: RwLock::new(SchemaResolver::new()),
                settings: RwLock::new(Settings::default()),
                associations: RwLock::new(None),
                workspace_root: RwLock::new(None),
                runs: Mutex::new(HashMap::new()),
                next_run: AtomicU64::new(0),
            }),
            scheduler: ValidationScheduler::new(options.debounce),
        }
    }

    pub async fn set_workspace_root(&self, root: Option<PathBuf>) {
        *self.state.workspace_root.write().await = root;
    }

    pub async fn workspace_root(&self) -> Option<PathBuf> {
        self.state.workspace_root.read().await.clone()
    }

    pub async fn settings(&self) -> Settings {
        self.state.settings.read().await.clone()
    }

    /// Replace the settings and re-resolve schemas.
    pub async fn update_settings(&self, settings: Settings) {
        *self.state.settings.write().await = settings;
        self.reconfigure().await;
    }

    /// Replace the schema associations pushed by the client.
    pub async fn update_associations(&self, associations: SchemaAssociations) {
        *self.state.associations.write().await = Some(associations);
        self.reconfigure().await;
    }

    /// Patterns currently routed to the Kubernetes schema.
    pub async fn kubernetes_patterns(&self) -> Vec<String> {
        self.state
            .resolver
            .read()
            .await
            .kubernetes_patterns()
            .iter()
            .cloned()
            .collect()
    }

    async fn reconfigure(&self) {
        let entries = {
            let associations = self.state.associations.read().await;
            let settings = self.state.settings.read().await;
            let root = self.state.workspace_root.read().await;
            self.state.resolver.write().await.resolve(
                associations.as_ref(),
                &settings.schemas,
                root.as_deref(),
            )
        };
        info!(schemas = entries.len(), "schema configuration updated");
        self.state.engine.service.configure(&entries);
        self.revalidate_all().await;
    }

    pub async fn open(&self, document: TextDocument) {
        let uri = document.uri.clone();
        self.state.documents.write().await.insert(uri.clone(), document);
        self.schedule(uri).await;
    }

    /// Replace the content of a document.
    pub async fn change(&self, document: TextDocument) {
        self.open(document).await;
    }

    /// Validate again without a content change (e.g. on save).
    pub async fn touch(&self, uri: &Url) {
        if self.is_open(uri).await {
            self.schedule(uri.clone()).await;
        }
    }

    pub async fn close(&self, uri: &Url) {
        self.scheduler.cancel(uri).await;
        self.state.runs.lock().await.remove(uri);
        self.state.cache.lock().await.on_document_removed(uri);
        self.state.documents.write().await.remove(uri);
        self.state.sink.publish(uri.clone(), Vec::new(), None).await;
    }

    pub async fn is_open(&self, uri: &Url) -> bool {
        self.state.documents.read().await.contains_key(uri)
    }

    /// True if a parse result for `uri` is cached.
    pub async fn is_cached(&self, uri: &Url) -> bool {
        self.state.cache.lock().await.contains(uri)
    }

    /// Drop cached schemas for changed files. Re-validates every open
    /// document if anything was dropped.
    pub async fn watched_files_changed(&self, uris: &[Url]) -> bool {
        let service = &self.state.engine.service;
        let invalidated = uris
            .iter()
            .filter(|uri| service.invalidate_schema(uri.as_str()))
            .count();
        if invalidated == 0 {
            return false;
        }
        debug!(invalidated, "cached schemas invalidated");
        self.revalidate_all().await;
        true
    }

    async fn revalidate_all(&self) {
        let uris: Vec<Url> = self.state.documents.read().await.keys().cloned().collect();
        for uri in uris {
            self.schedule(uri).await;
        }
    }

    async fn schedule(&self, uri: Url) {
        let run = self.state.begin_run(&uri).await;
        let state = Arc::clone(&self.state);
        self.scheduler
            .trigger(uri.clone(), async move { state.validate(uri, run).await })
            .await;
    }

    pub async fn completion(&self, uri: &Url, position: Position) -> Option<CompletionList> {
        if !self.state.settings.read().await.completion {
            return None;
        }
        let document = self.state.snapshot(uri).await?;
        let specialized = self.state.is_specialized(uri).await;

        let engine = self.state.engine_handles();
        run_blocking("completion", move || {
            let repaired = repair_completion_context(&document.text, position);
            let document = document.with_text(repaired.text);
            let yaml = engine.parser.parse(&document.text);
            engine
                .service
                .complete(&document, repaired.position, &yaml, specialized)
        })
        .await
    }

    pub async fn hover(&self, uri: &Url, position: Position) -> Option<HoverInfo> {
        if !self.state.settings.read().await.hover {
            return None;
        }
        let document = self.state.snapshot(uri).await?;
        let yaml = self.state.parsed(&document).await;
        let specialized = self.state.is_specialized(uri).await;

        let service = Arc::clone(&self.state.engine.service);
        run_blocking("hover", move || {
            service.hover(&document, position, &yaml, specialized)
        })
        .await
        .flatten()
    }

    pub async fn document_symbols(&self, uri: &Url) -> Vec<DocumentSymbol> {
        let Some(document) = self.state.snapshot(uri).await else {
            return Vec::new();
        };
        let yaml = self.state.parsed(&document).await;
        let specialized = self.state.is_specialized(uri).await;

        let service = Arc::clone(&self.state.engine.service);
        run_blocking("document symbols", move || {
            Ok(service.document_symbols(&document, &yaml, specialized))
        })
        .await
        .unwrap_or_default()
    }

    /// Abort pending validations and drop cached parses.
    pub async fn shutdown(&self) {
        self.scheduler.cancel_all().await;
        self.state.cache.lock().await.dispose();
        info!("session shut down");
    }
}

/// Cloned collaborator handles, for moving into blocking tasks.
struct EngineHandles {
    parser: Arc<dyn StructuralParser>,
    service: Arc<dyn LanguageService>,
}

impl State {
    fn engine_handles(&self) -> EngineHandles {
        EngineHandles {
            parser: Arc::clone(&self.engine.parser),
            service: Arc::clone(&self.engine.service),
        }
    }

    async fn snapshot(&self, uri: &Url) -> Option<TextDocument> {
        self.documents.read().await.get(uri).cloned()
    }

    async fn parsed(&self, document: &TextDocument) -> Arc<YamlDocument> {
        let parser = &self.engine.parser;
        self.cache
            .lock()
            .await
            .get(document, |doc| parser.parse(&doc.text))
    }

    async fn is_specialized(&self, uri: &Url) -> bool {
        self.resolver
            .read()
            .await
            .is_kubernetes(self.engine.matcher.as_ref(), uri.as_str())
    }

    /// Record a new validation run for `uri`. Earlier runs still in flight
    /// become stale.
    async fn begin_run(&self, uri: &Url) -> u64 {
        let run = self.next_run.fetch_add(1, Ordering::Relaxed) + 1;
        self.runs.lock().await.insert(uri.clone(), run);
        run
    }

    async fn validate(self: Arc<Self>, uri: Url, run: u64) {
        let Some(document) = self.snapshot(&uri).await else {
            return;
        };
        let version = document.version;

        if !self.settings.read().await.validate || document.is_empty() {
            self.publish_current(uri, run, version, Vec::new()).await;
            return;
        }

        let yaml = self.parsed(&document).await;
        let specialized = self.is_specialized(&uri).await;

        let service = Arc::clone(&self.engine.service);
        let result =
            tokio::task::spawn_blocking(move || service.validate(&document, &yaml, specialized))
                .await;

        let diagnostics = match result {
            Ok(Ok(raw)) => normalize_diagnostics(raw),
            Ok(Err(e)) => {
                debug!(uri = %uri, error = %e, "validation failed, keeping previous diagnostics");
                return;
            }
            Err(e) => {
                warn!(uri = %uri, error = %e, "validation task failed");
                return;
            }
        };

        self.publish_current(uri, run, version, diagnostics).await;
    }

    /// Publish the result of `run` if it is still the latest run and the
    /// document is still open at `version`.
    ///
    /// The document map stays read-locked until the sink returns, so a
    /// concurrent close publishes its empty set after this one.
    async fn publish_current(
        &self,
        uri: Url,
        run: u64,
        version: i32,
        diagnostics: Vec<Diagnostic>,
    ) {
        let documents = self.documents.read().await;
        let open_at_version = documents.get(&uri).map(|d| d.version) == Some(version);
        let latest = self.runs.lock().await.get(&uri).copied() == Some(run);
        if !open_at_version || !latest {
            debug!(uri = %uri, version, run, "dropping stale validation result");
            return;
        }

        self.sink.publish(uri, diagnostics, Some(version)).await;
        drop(documents);
    }
}

async fn run_blocking<T, F>(request: &'static str, f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> EngineResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            debug!(request, error = %e, "language service request failed");
            None
        }
        Err(e) => {
            warn!(request, error = %e, "language service task failed");
            None
        }
    }
}
