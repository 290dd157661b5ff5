//! Maps yamlsense-core diagnostics and positions to LSP types.

use tower_lsp::lsp_types::{
    CodeDescription, Diagnostic as LspDiagnostic, DiagnosticSeverity, Position as LspPosition,
    Range as LspRange, Url,
};
use yamlsense_core::{Diagnostic, Position, Range, Severity};

pub fn to_lsp_position(position: Position) -> LspPosition {
    LspPosition {
        line: position.line,
        character: position.character,
    }
}

pub fn from_lsp_position(position: LspPosition) -> Position {
    Position::new(position.line, position.character)
}

pub fn to_lsp_range(range: Range) -> LspRange {
    LspRange {
        start: to_lsp_position(range.start),
        end: to_lsp_position(range.end),
    }
}

/// Convert a yamlsense-core diagnostic to an LSP diagnostic.
///
/// Diagnostics that came from a schema link to it through `codeDescription`
/// when the schema URI is a URL the editor can open.
pub fn to_lsp_diagnostic(diag: &Diagnostic) -> LspDiagnostic {
    let severity = match diag.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    };

    let code_description = diag
        .schema
        .as_deref()
        .filter(|uri| uri.starts_with("http://") || uri.starts_with("https://"))
        .and_then(|uri| Url::parse(uri).ok())
        .map(|href| CodeDescription { href });

    LspDiagnostic {
        range: to_lsp_range(diag.range),
        severity: Some(severity),
        code: None,
        code_description,
        source: diag.source.clone(),
        message: diag.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}

/// Convert a vector of yamlsense-core diagnostics to LSP diagnostics.
pub fn to_lsp_diagnostics(diagnostics: Vec<Diagnostic>) -> Vec<LspDiagnostic> {
    diagnostics.iter().map(to_lsp_diagnostic).collect()
}
