//! Hover and document symbol adapters.

use tower_lsp::lsp_types::{
    DocumentSymbol as LspDocumentSymbol, Hover, HoverContents, MarkupContent, MarkupKind,
    SymbolKind as LspSymbolKind,
};
use yamlsense_core::{DocumentSymbol, HoverInfo, SymbolKind};

use crate::diagnostic_mapper::to_lsp_range;

/// Convert engine hover info to an LSP hover with Markdown content.
pub fn to_hover(info: HoverInfo) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: info.markdown,
        }),
        range: Some(to_lsp_range(info.range)),
    }
}

fn symbol_kind(kind: SymbolKind) -> LspSymbolKind {
    match kind {
        SymbolKind::Object => LspSymbolKind::OBJECT,
        SymbolKind::Array => LspSymbolKind::ARRAY,
        SymbolKind::String => LspSymbolKind::STRING,
        SymbolKind::Number => LspSymbolKind::NUMBER,
        SymbolKind::Boolean => LspSymbolKind::BOOLEAN,
        SymbolKind::Null => LspSymbolKind::NULL,
    }
}

/// Convert the engine outline to nested LSP document symbols.
#[allow(deprecated)] // `DocumentSymbol::deprecated` must still be initialized
pub fn to_document_symbols(symbols: Vec<DocumentSymbol>) -> Vec<LspDocumentSymbol> {
    symbols
        .into_iter()
        .map(|symbol| LspDocumentSymbol {
            name: symbol.name,
            detail: None,
            kind: symbol_kind(symbol.kind),
            tags: None,
            deprecated: None,
            range: to_lsp_range(symbol.range),
            selection_range: to_lsp_range(symbol.selection_range),
            children: if symbol.children.is_empty() {
                None
            } else {
                Some(to_document_symbols(symbol.children))
            },
        })
        .collect()
}
