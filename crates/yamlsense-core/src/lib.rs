//! # yamlsense-core
//!
//! Editor-independent core of the yamlsense YAML language server.
//!
//! Provides:
//! - Schema association resolution (client notifications + workspace settings)
//! - A bounded, version-aware parse cache
//! - Completion context repair for half-typed YAML lines
//! - Diagnostics normalization
//! - A default YAML language engine backed by `serde_yaml` and `jsonschema`

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod matcher;
pub mod position;
pub mod repair;
pub mod schema;

pub use cache::ParseCache;
pub use config::{FileMatch, SchemaList, SchemaSetting, Settings};
pub use diagnostics::{
    Diagnostic, EngineError, EngineResult, Severity, normalize_diagnostics,
};
pub use document::TextDocument;
pub use engine::{
    CompletionItem, CompletionKind, CompletionList, DocumentSymbol, HoverInfo, LanguageService,
    SchemaLanguageService, StructuralParser, SymbolKind, YamlDocument, YamlParser,
};
pub use matcher::{GlobMatcher, PatternMatcher};
pub use position::{Position, Range};
pub use repair::{ANCHOR_KEY, RepairedContext, repair_completion_context};
pub use schema::{KUBERNETES_SCHEMA_URL, SchemaAssociations, SchemaConfigEntry, SchemaResolver};
