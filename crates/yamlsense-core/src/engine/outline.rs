//! Line-based key outline of a YAML section.
//!
//! `serde_yaml` values carry no source positions, so key locations are
//! recovered by scanning the text: every `key:` line becomes an
//! [`OutlineNode`] with its span and its path through mappings and sequences.

use crate::position::{Position, Range};

/// One step of a path into a YAML value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// True if this segment names the same step as a JSON pointer token.
    pub fn matches_pointer_token(&self, token: &str) -> bool {
        match self {
            PathSegment::Key(key) => key == token,
            PathSegment::Index(index) => index.to_string() == token,
        }
    }
}

/// A mapping key found in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub key: String,
    /// Path from the section root to this key, ending with the key itself
    pub path: Vec<PathSegment>,
    pub line: u32,
    pub key_range: Range,
    /// Last line belonging to this key's value
    pub end_line: u32,
    /// Index of the closest enclosing key node
    pub parent: Option<usize>,
}

impl OutlineNode {
    /// Path of the mapping (or sequence item) holding this key.
    pub fn parent_path(&self) -> &[PathSegment] {
        &self.path[..self.path.len().saturating_sub(1)]
    }
}

struct Frame {
    indent: i64,
    path: Vec<PathSegment>,
    node: Option<usize>,
    is_item: bool,
    next_index: usize,
}

/// Scan `text` (a single YAML document) whose first line is `first_line`.
pub fn scan_outline(text: &str, first_line: u32) -> Vec<OutlineNode> {
    let mut nodes: Vec<OutlineNode> = Vec::new();
    let mut frames = vec![Frame {
        indent: -1,
        path: Vec::new(),
        node: None,
        is_item: false,
        next_index: 0,
    }];
    // (column the block scalar's owner key starts at, owner node)
    let mut block_scalar: Option<(usize, usize)> = None;

    for (offset, raw) in text.split('\n').enumerate() {
        let line_no = first_line + offset as u32;
        let line = raw.trim_end_matches('\r');
        let indent = line.len() - line.trim_start_matches(' ').len();
        let content = &line[indent..];

        if let Some((owner_col, owner)) = block_scalar {
            if content.is_empty() {
                continue;
            }
            if indent > owner_col {
                nodes[owner].end_line = line_no;
                continue;
            }
            block_scalar = None;
        }

        if content.is_empty() || content.starts_with('#') || is_document_marker(content) {
            continue;
        }

        let starts_with_dash = is_dash(content);
        while frames.len() > 1 {
            let Some(top) = frames.last() else { break };
            let line_indent = indent as i64;
            let pop = top.indent > line_indent
                || (top.indent == line_indent && (top.is_item || !starts_with_dash));
            if !pop {
                break;
            }
            frames.pop();
        }

        let mut col = indent;
        let mut rest = content;
        while is_dash(rest) {
            let Some(parent) = frames.last_mut() else { break };
            let index = parent.next_index;
            parent.next_index += 1;
            let mut path = parent.path.clone();
            path.push(PathSegment::Index(index));
            let node = parent.node;
            frames.push(Frame {
                indent: col as i64,
                path,
                node,
                is_item: true,
                next_index: 0,
            });

            let after = &rest[1..];
            let spaces = after.len() - after.trim_start_matches(' ').len();
            col += 1 + spaces;
            rest = &after[spaces..];
        }

        if let Some(enclosing) = frames.last().and_then(|f| f.node) {
            nodes[enclosing].end_line = line_no;
        }

        let Some(found) = parse_key(rest) else {
            continue;
        };

        let Some(parent) = frames.last() else { continue };
        let mut path = parent.path.clone();
        path.push(PathSegment::Key(found.key.clone()));

        let start_char = line[..col].chars().count() as u32;
        let end_char = start_char + rest[..found.key_len].chars().count() as u32;
        let node_idx = nodes.len();
        nodes.push(OutlineNode {
            key: found.key,
            path: path.clone(),
            line: line_no,
            key_range: Range::new(
                Position::new(line_no, start_char),
                Position::new(line_no, end_char),
            ),
            end_line: line_no,
            parent: parent.node,
        });

        let value = rest[found.colon + 1..].trim_start();
        if value.starts_with('|') || value.starts_with('>') {
            block_scalar = Some((col, node_idx));
        }

        frames.push(Frame {
            indent: col as i64,
            path,
            node: Some(node_idx),
            is_item: false,
            next_index: 0,
        });
    }

    for idx in (0..nodes.len()).rev() {
        if let Some(parent) = nodes[idx].parent {
            nodes[parent].end_line = nodes[parent].end_line.max(nodes[idx].end_line);
        }
    }

    nodes
}

fn is_dash(content: &str) -> bool {
    content == "-" || content.starts_with("- ")
}

pub(crate) fn is_document_marker(content: &str) -> bool {
    let trimmed = content.trim_end();
    trimmed == "---" || trimmed == "..." || content.starts_with("--- ")
}

struct KeyMatch {
    key: String,
    /// Bytes of the key as written (quotes included)
    key_len: usize,
    /// Byte index of the colon
    colon: usize,
}

/// Recognize `key:` at the start of `rest`.
fn parse_key(rest: &str) -> Option<KeyMatch> {
    let first = rest.chars().next()?;
    if matches!(first, '[' | '{' | '#' | '&' | '*' | '!' | '|' | '>') {
        return None;
    }

    if first == '"' || first == '\'' {
        let close = rest[1..].find(first)? + 1;
        let key = rest[1..close].to_string();
        let after = &rest[close + 1..];
        let spaces = after.len() - after.trim_start_matches(' ').len();
        let colon = close + 1 + spaces;
        if !is_mapping_colon(rest, colon) {
            return None;
        }
        return Some(KeyMatch {
            key,
            key_len: close + 1,
            colon,
        });
    }

    let mut prev = ' ';
    for (idx, c) in rest.char_indices() {
        if c == '#' && prev == ' ' {
            return None;
        }
        if c == ':' && is_mapping_colon(rest, idx) {
            let key = rest[..idx].trim_end();
            if key.is_empty() {
                return None;
            }
            return Some(KeyMatch {
                key: key.to_string(),
                key_len: key.len(),
                colon: idx,
            });
        }
        prev = c;
    }
    None
}

fn is_mapping_colon(text: &str, idx: usize) -> bool {
    text[idx..].starts_with(':')
        && matches!(text[idx + 1..].chars().next(), None | Some(' ' | '\t'))
}
