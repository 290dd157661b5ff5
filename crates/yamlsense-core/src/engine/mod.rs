//! YAML language engine.
//!
//! The session talks to the engine only through [`StructuralParser`] and
//! [`LanguageService`]. [`YamlParser`] and [`SchemaLanguageService`] are the
//! default implementations: `serde_yaml` for structure, `jsonschema` for
//! validation, and schema navigation for completion and hover.

mod navigate;
mod outline;
mod parser;
mod service;
mod store;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, EngineResult};
use crate::document::TextDocument;
use crate::position::{Position, Range};
use crate::schema::SchemaConfigEntry;

pub use navigate::{SchemaNavigator, narrow_for_kind};
pub use outline::{OutlineNode, PathSegment, scan_outline};
pub use parser::{SyntaxError, YamlDocument, YamlParser, YamlSection, parse_yaml, yaml_to_json};
pub use service::SchemaLanguageService;
pub use store::{DefaultFetcher, SchemaFetcher, SchemaStore};

/// Turns document text into a [`YamlDocument`]. Never fails: syntax errors
/// are recorded on the sections.
pub trait StructuralParser: Send + Sync {
    fn parse(&self, text: &str) -> YamlDocument;
}

/// Schema-backed language features for one YAML document.
///
/// `specialized` marks documents routed to the Kubernetes schema.
pub trait LanguageService: Send + Sync {
    /// Replace the effective schema configuration.
    fn configure(&self, entries: &[SchemaConfigEntry]);

    fn validate(
        &self,
        document: &TextDocument,
        yaml: &YamlDocument,
        specialized: bool,
    ) -> EngineResult<Vec<Diagnostic>>;

    fn complete(
        &self,
        document: &TextDocument,
        position: Position,
        yaml: &YamlDocument,
        specialized: bool,
    ) -> EngineResult<CompletionList>;

    fn hover(
        &self,
        document: &TextDocument,
        position: Position,
        yaml: &YamlDocument,
        specialized: bool,
    ) -> EngineResult<Option<HoverInfo>>;

    fn document_symbols(
        &self,
        document: &TextDocument,
        yaml: &YamlDocument,
        specialized: bool,
    ) -> Vec<DocumentSymbol>;

    /// Drop any cached copy of the schema at `uri`. Returns true if something
    /// was dropped.
    fn invalidate_schema(&self, uri: &str) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionList {
    pub is_incomplete: bool,
    pub items: Vec<CompletionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub detail: Option<String>,
    pub documentation: Option<String>,
    pub insert_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionKind {
    /// A mapping key
    Key,
    /// A scalar value
    Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoverInfo {
    /// Markdown content
    pub markdown: String,
    pub range: Range,
}

/// One node of the document outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Key through the end of its value
    pub range: Range,
    /// The key text
    pub selection_range: Range,
    pub children: Vec<DocumentSymbol>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}
