//! YAML structural parser

use serde_json::{Map, Number, Value};

use super::StructuralParser;
use super::outline::{OutlineNode, PathSegment, is_document_marker, scan_outline};
use crate::position::{Position, Range};

/// A parsed YAML stream, one section per `---` separated document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YamlDocument {
    pub sections: Vec<YamlSection>,
}

/// One document of a YAML stream
#[derive(Debug, Clone, PartialEq)]
pub struct YamlSection {
    pub start_line: u32,
    pub end_line: u32,
    /// Parsed value, `None` when the section has a syntax error
    pub value: Option<Value>,
    pub outline: Vec<OutlineNode>,
    pub syntax_error: Option<SyntaxError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
}

impl YamlDocument {
    /// Section containing `line`, falling back to the last one.
    pub fn section_at(&self, line: u32) -> Option<&YamlSection> {
        self.sections
            .iter()
            .find(|s| s.start_line <= line && line <= s.end_line)
            .or_else(|| self.sections.last())
    }

    pub fn syntax_errors(&self) -> impl Iterator<Item = &SyntaxError> {
        self.sections.iter().filter_map(|s| s.syntax_error.as_ref())
    }
}

impl YamlSection {
    /// Key node on `line`, if the line holds one.
    pub fn node_on_line(&self, line: u32) -> Option<&OutlineNode> {
        self.outline.iter().find(|n| n.line == line)
    }

    /// Key node whose key text spans `position`.
    pub fn node_at(&self, position: Position) -> Option<&OutlineNode> {
        self.outline
            .iter()
            .find(|n| n.key_range.contains(position))
    }

    /// Keys already present directly under `parent`.
    pub fn keys_under<'a>(&'a self, parent: &'a [PathSegment]) -> impl Iterator<Item = &'a OutlineNode> {
        self.outline
            .iter()
            .filter(move |n| n.parent_path() == parent)
    }

    /// Range to report a problem at the value addressed by a JSON pointer.
    ///
    /// Uses the deepest key found along the pointer; falls back to the first
    /// line of the section.
    pub fn range_for_pointer(&self, pointer: &str) -> Range {
        let tokens: Vec<String> = pointer
            .split('/')
            .skip(1)
            .map(|t| t.replace("~1", "/").replace("~0", "~"))
            .collect();

        for len in (1..=tokens.len()).rev() {
            let prefix = &tokens[..len];
            let found = self.outline.iter().find(|n| {
                n.path.len() == prefix.len()
                    && n.path
                        .iter()
                        .zip(prefix)
                        .all(|(segment, token)| segment.matches_pointer_token(token))
            });
            if let Some(node) = found {
                return node.key_range;
            }
        }

        Range::on_line(self.start_line, 0, 0)
    }

    /// Value addressed by an outline path.
    pub fn value_at(&self, path: &[PathSegment]) -> Option<&Value> {
        let mut current = self.value.as_ref()?;
        for segment in path {
            current = match segment {
                PathSegment::Key(key) => current.get(key.as_str())?,
                PathSegment::Index(index) => current.get(*index)?,
            };
        }
        Some(current)
    }
}

/// Default [`StructuralParser`] backed by `serde_yaml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlParser;

impl StructuralParser for YamlParser {
    fn parse(&self, text: &str) -> YamlDocument {
        parse_yaml(text)
    }
}

/// Parse a YAML stream into sections.
pub fn parse_yaml(text: &str) -> YamlDocument {
    let lines: Vec<&str> = text.split('\n').collect();

    let mut boundaries: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim_end_matches('\r');
            line.starts_with("---") && is_document_marker(line)
        })
        .map(|(idx, _)| idx)
        .collect();
    if boundaries.first() != Some(&0) {
        boundaries.insert(0, 0);
    }
    boundaries.push(lines.len());

    let sections = boundaries
        .windows(2)
        .map(|window| parse_section(&lines, window[0], window[1]))
        .collect();

    YamlDocument { sections }
}

fn parse_section(lines: &[&str], start: usize, end: usize) -> YamlSection {
    let section_text = lines[start..end]
        .iter()
        .map(|&line| {
            if is_document_marker(line.trim_end_matches('\r')) {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let start_line = start as u32;
    let outline = scan_outline(&section_text, start_line);

    let (value, syntax_error) = match serde_yaml::from_str::<serde_yaml::Value>(&section_text) {
        Ok(value) => (Some(yaml_to_json(value)), None),
        Err(err) => {
            let position = err
                .location()
                .map(|loc| {
                    Position::new(
                        start_line + loc.line().saturating_sub(1) as u32,
                        loc.column().saturating_sub(1) as u32,
                    )
                })
                .unwrap_or(Position::new(start_line, 0));
            let message = err.to_string();
            (None, Some(SyntaxError { message, position }))
        }
    };

    YamlSection {
        start_line,
        end_line: end.saturating_sub(1).max(start) as u32,
        value,
        outline,
        syntax_error,
    }
}

/// Convert a YAML value to JSON. Non-string mapping keys are stringified.
pub fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                object.insert(key_to_string(key), yaml_to_json(value));
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn key_to_string(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
