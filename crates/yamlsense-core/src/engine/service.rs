//! Default [`LanguageService`]: JSON Schema validation, completion, hover and
//! document symbols for YAML.

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::Value;

use super::navigate::{SchemaNavigator, allows_type, narrow_for_kind, properties, type_label};
use super::outline::PathSegment;
use super::parser::{YamlDocument, YamlSection};
use super::store::{DefaultFetcher, SchemaFetcher, SchemaStore};
use super::{
    CompletionItem, CompletionKind, CompletionList, DocumentSymbol, HoverInfo, LanguageService,
    SymbolKind,
};
use crate::diagnostics::{Diagnostic, EngineResult};
use crate::document::TextDocument;
use crate::matcher::{GlobMatcher, PatternMatcher};
use crate::position::{Position, Range};
use crate::repair::ANCHOR_KEY;
use crate::schema::SchemaConfigEntry;

/// Language service backed by a [`SchemaStore`].
pub struct SchemaLanguageService {
    store: SchemaStore,
    matcher: Arc<dyn PatternMatcher>,
}

impl SchemaLanguageService {
    pub fn new(fetcher: Arc<dyn SchemaFetcher>, matcher: Arc<dyn PatternMatcher>) -> Self {
        Self {
            store: SchemaStore::new(fetcher),
            matcher,
        }
    }

    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    /// Schemas for `document`, narrowed to the section's `kind` when
    /// specialized.
    fn schemas_for(
        &self,
        document: &TextDocument,
        section: &YamlSection,
        specialized: bool,
    ) -> EngineResult<Vec<(String, Value)>> {
        let kind = section_kind(section, specialized);
        let mut schemas = Vec::new();
        for uri in self.store.matching(document.uri.as_str(), self.matcher.as_ref()) {
            let body = self.store.load(&uri)?;
            let schema = match kind {
                Some(kind) => narrow_for_kind(&body, kind).into_owned(),
                None => body.as_ref().clone(),
            };
            schemas.push((uri, schema));
        }
        Ok(schemas)
    }
}

impl Default for SchemaLanguageService {
    fn default() -> Self {
        Self::new(Arc::new(DefaultFetcher), Arc::new(GlobMatcher))
    }
}

fn section_kind(section: &YamlSection, specialized: bool) -> Option<&str> {
    if !specialized {
        return None;
    }
    section.value.as_ref()?.get("kind")?.as_str()
}

impl LanguageService for SchemaLanguageService {
    fn configure(&self, entries: &[SchemaConfigEntry]) {
        self.store.configure(entries);
    }

    fn validate(
        &self,
        document: &TextDocument,
        yaml: &YamlDocument,
        specialized: bool,
    ) -> EngineResult<Vec<Diagnostic>> {
        let mut diagnostics: Vec<Diagnostic> = yaml
            .syntax_errors()
            .map(|error| {
                let at = error.position;
                let range = Range::on_line(at.line, at.character, at.character + 1);
                Diagnostic::error(range, error.message.clone())
            })
            .collect();

        let schema_uris = self
            .store
            .matching(document.uri.as_str(), self.matcher.as_ref());
        if schema_uris.is_empty() {
            return Ok(diagnostics);
        }

        for section in &yaml.sections {
            let Some(instance) = section.value.as_ref().filter(|v| !v.is_null()) else {
                continue;
            };
            let kind = section_kind(section, specialized);
            for uri in &schema_uris {
                let validator = self.store.validator(uri, kind)?;
                for error in validator.iter_errors(instance) {
                    let pointer = error.instance_path().to_string();
                    let range = section.range_for_pointer(&pointer);
                    diagnostics.push(Diagnostic::warning(range, error.to_string()).with_schema(uri));
                }
            }
        }

        Ok(diagnostics)
    }

    fn complete(
        &self,
        document: &TextDocument,
        position: Position,
        yaml: &YamlDocument,
        specialized: bool,
    ) -> EngineResult<CompletionList> {
        let Some(section) = yaml.section_at(position.line) else {
            return Ok(CompletionList::default());
        };
        let node = section.node_on_line(position.line);
        let schemas = self.schemas_for(document, section, specialized)?;

        let mut items: Vec<CompletionItem> = Vec::new();
        match node {
            Some(node) if position.character > node.key_range.end.character => {
                for (_, schema) in &schemas {
                    let nav = SchemaNavigator::new(schema);
                    for candidate in nav.at_path(&node.path) {
                        push_value_items(candidate, &mut items);
                    }
                }
            }
            _ => {
                let parent: &[PathSegment] = node.map_or(&[], |n| n.parent_path());
                let present: Vec<&str> = section
                    .keys_under(parent)
                    .filter(|sibling| node.is_none_or(|n| sibling.line != n.line))
                    .map(|sibling| sibling.key.as_str())
                    .collect();

                for (_, schema) in &schemas {
                    let nav = SchemaNavigator::new(schema);
                    let candidates = nav.at_path(parent);
                    for (name, property) in properties(&candidates) {
                        if name == ANCHOR_KEY
                            || present.contains(&name)
                            || items.iter().any(|item| item.label == name)
                        {
                            continue;
                        }
                        let resolved = nav.expand(property);
                        items.push(CompletionItem {
                            label: name.to_string(),
                            kind: CompletionKind::Key,
                            detail: resolved.iter().find_map(|s| type_label(s)),
                            documentation: resolved.iter().find_map(|s| description(s)),
                            insert_text: Some(format!("{name}: ")),
                        });
                    }
                }
            }
        }

        Ok(CompletionList {
            is_incomplete: false,
            items,
        })
    }

    fn hover(
        &self,
        document: &TextDocument,
        position: Position,
        yaml: &YamlDocument,
        specialized: bool,
    ) -> EngineResult<Option<HoverInfo>> {
        let Some(section) = yaml.section_at(position.line) else {
            return Ok(None);
        };
        let Some(node) = section.node_at(position) else {
            return Ok(None);
        };

        for (uri, schema) in self.schemas_for(document, section, specialized)? {
            let nav = SchemaNavigator::new(&schema);
            let candidates = nav.at_path(&node.path);
            let title = candidates.iter().find_map(|s| s.get("title")?.as_str());
            let summary = candidates.iter().find_map(|s| description(s));
            if title.is_none() && summary.is_none() {
                continue;
            }

            let mut markdown = String::new();
            if let Some(title) = title {
                markdown.push_str(&format!("#### {title}\n\n"));
            }
            if let Some(summary) = summary {
                markdown.push_str(&summary);
                markdown.push_str("\n\n");
            }
            markdown.push_str(&format!("Source: [{}]({uri})", schema_name(&uri)));

            return Ok(Some(HoverInfo {
                markdown,
                range: node.key_range,
            }));
        }

        Ok(None)
    }

    fn document_symbols(
        &self,
        document: &TextDocument,
        yaml: &YamlDocument,
        _specialized: bool,
    ) -> Vec<DocumentSymbol> {
        let lines: Vec<&str> = document.text.split('\n').collect();
        let mut symbols = Vec::new();
        for section in &yaml.sections {
            let mut children: Vec<Vec<usize>> = vec![Vec::new(); section.outline.len()];
            let mut roots = Vec::new();
            for (idx, node) in section.outline.iter().enumerate() {
                match node.parent {
                    Some(parent) => children[parent].push(idx),
                    None => roots.push(idx),
                }
            }
            symbols.extend(
                roots
                    .into_iter()
                    .map(|idx| build_symbol(section, idx, &children, &lines)),
            );
        }
        symbols
    }

    fn invalidate_schema(&self, uri: &str) -> bool {
        self.store.invalidate(uri)
    }
}

fn description(schema: &Value) -> Option<String> {
    schema
        .get("markdownDescription")
        .or_else(|| schema.get("description"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Last path segment of a schema URI, for display.
fn schema_name(uri: &str) -> &str {
    uri.trim_end_matches('/').rsplit('/').next().unwrap_or(uri)
}

fn push_value_items(schema: &Value, items: &mut Vec<CompletionItem>) {
    let mut values: Vec<Cow<'_, Value>> = Vec::new();
    if let Some(Value::Array(options)) = schema.get("enum") {
        values.extend(options.iter().map(Cow::Borrowed));
    }
    if let Some(constant) = schema.get("const") {
        values.push(Cow::Borrowed(constant));
    }
    if allows_type(schema, "boolean") {
        values.push(Cow::Owned(Value::Bool(true)));
        values.push(Cow::Owned(Value::Bool(false)));
    }
    if let Some(default) = schema.get("default").filter(|d| !d.is_object() && !d.is_array()) {
        values.push(Cow::Borrowed(default));
    }

    for value in values {
        let label = match value.as_ref() {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if items.iter().any(|item| item.label == label) {
            continue;
        }
        items.push(CompletionItem {
            insert_text: Some(label.clone()),
            label,
            kind: CompletionKind::Value,
            detail: type_label(schema),
            documentation: description(schema),
        });
    }
}

fn build_symbol(
    section: &YamlSection,
    idx: usize,
    children: &[Vec<usize>],
    lines: &[&str],
) -> DocumentSymbol {
    let node = &section.outline[idx];
    let end_character = lines
        .get(node.end_line as usize)
        .map_or(0, |line| line.trim_end_matches('\r').chars().count() as u32);

    DocumentSymbol {
        name: node.key.clone(),
        kind: symbol_kind(section.value_at(&node.path)),
        range: Range::new(
            node.key_range.start,
            Position::new(node.end_line, end_character),
        ),
        selection_range: node.key_range,
        children: children[idx]
            .iter()
            .map(|&child| build_symbol(section, child, children, lines))
            .collect(),
    }
}

fn symbol_kind(value: Option<&Value>) -> SymbolKind {
    match value {
        Some(Value::Object(_)) => SymbolKind::Object,
        Some(Value::Array(_)) => SymbolKind::Array,
        Some(Value::String(_)) => SymbolKind::String,
        Some(Value::Number(_)) => SymbolKind::Number,
        Some(Value::Bool(_)) => SymbolKind::Boolean,
        Some(Value::Null) | None => SymbolKind::Null,
    }
}
