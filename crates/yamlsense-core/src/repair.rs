//! Completion context repair.
//!
//! Completion needs the line under the cursor to look like a mapping entry.
//! While a key is being typed the line has no colon yet, so the buffer is
//! patched before parsing: a colon is appended to partial keys, and blank
//! lines get a throwaway anchor key.

use crate::position::{Position, line_starts};

/// Key inserted on blank lines. Completion engines must ignore it.
pub const ANCHOR_KEY: &str = "__yamlsense_completion_anchor__";

/// Line break written after the patched line.
const LINE_BREAK: &str = "\r\n";

/// Buffer and cursor to run completion against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedContext {
    pub text: String,
    pub position: Position,
}

/// Patch `text` so the line at `position` parses as a mapping entry.
///
/// - Line already has a colon: text unchanged, cursor moved one left.
/// - Blank line or lone `-`: line replaced by the anchor key, keeping its
///   indentation and dash.
/// - Partial key: trailing whitespace dropped and a colon appended.
///
/// In the last two cases the cursor character is returned as is. Positions
/// past the last line act on the last line, and the returned cursor is moved
/// onto it.
pub fn repair_completion_context(text: &str, position: Position) -> RepairedContext {
    let starts = line_starts(text);
    let line_idx = (position.line as usize).min(starts.len() - 1);
    let line_no = line_idx as u32;
    let start = starts[line_idx];
    let next_start = starts.get(line_idx + 1).copied();
    let end = next_start.unwrap_or(text.len());
    let line = text[start..end].trim_end_matches(['\n', '\r']);

    if line.contains(':') {
        return RepairedContext {
            text: text.to_string(),
            position: Position::new(line_no, position.character.saturating_sub(1)),
        };
    }

    let trimmed = line.trim();
    let replacement = if trimmed.is_empty() || trimmed == "-" {
        let indent = &line[..line.len() - line.trim_start().len()];
        let dash = if trimmed == "-" { "- " } else { "" };
        format!("{indent}{dash}{ANCHOR_KEY}:")
    } else {
        format!("{}:", line.trim_end())
    };

    // The splice swallows the current line's own terminator (`\n` or `\r\n`)
    // when another line follows, rather than a fixed two bytes, so LF buffers
    // keep the first character of the next line. On the last line it runs to
    // the end of the buffer.
    let rest = match next_start {
        Some(next) => &text[next..],
        None => "",
    };

    let mut repaired = String::with_capacity(text.len() + replacement.len() + LINE_BREAK.len());
    repaired.push_str(&text[..start]);
    repaired.push_str(&replacement);
    repaired.push_str(LINE_BREAK);
    repaired.push_str(rest);

    RepairedContext {
        text: repaired,
        position: Position::new(line_no, position.character),
    }
}
