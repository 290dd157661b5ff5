//! Completion provider adapter for the yamlsense language engine.

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionList as LspCompletionList, CompletionResponse,
    Documentation, InsertTextFormat, MarkupContent, MarkupKind,
};
use yamlsense_core::{CompletionKind, CompletionList};

fn completion_kind(kind: CompletionKind) -> CompletionItemKind {
    match kind {
        CompletionKind::Key => CompletionItemKind::FIELD,
        CompletionKind::Value => CompletionItemKind::VALUE,
    }
}

/// Convert an engine completion list to an LSP completion response.
pub fn to_completion_response(list: CompletionList) -> CompletionResponse {
    let items = list
        .items
        .into_iter()
        .map(|candidate| {
            let docs = candidate.documentation.map(|docs| {
                Documentation::MarkupContent(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value: docs,
                })
            });

            CompletionItem {
                label: candidate.label,
                kind: Some(completion_kind(candidate.kind)),
                detail: candidate.detail,
                documentation: docs,
                insert_text: candidate.insert_text,
                insert_text_format: Some(InsertTextFormat::PLAIN_TEXT),
                ..Default::default()
            }
        })
        .collect();

    CompletionResponse::List(LspCompletionList {
        is_incomplete: list.is_incomplete,
        items,
    })
}
