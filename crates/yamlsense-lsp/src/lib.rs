//! # yamlsense-lsp
//!
//! Language Server Protocol implementation for yamlsense.
//!
//! Provides YAML document intelligence backed by JSON Schema in editors
//! that support LSP (VS Code, Neovim, Helix, etc.).
//!
//! ## Features
//!
//! - Debounced validation on open and change, published per document
//! - Schema associations from settings, `.yamlsense.toml` and the
//!   `json/schemaAssociations` notification
//! - Key and value completion, even on half-typed lines
//! - Hover documentation from schema titles and descriptions
//! - Document outline
//!
//! ## Usage
//!
//! Run the LSP server:
//!
//! ```bash
//! yamlsense-lsp --stdio
//! ```
//!
//! The server communicates over stdin/stdout using the LSP protocol.

mod backend;
mod client_config;
mod completion_provider;
mod debounce;
mod diagnostic_mapper;
mod hover_provider;
mod session;

pub use backend::{Backend, SCHEMA_ASSOCIATIONS_METHOD};
pub use client_config::ClientSettings;
pub use debounce::ValidationScheduler;
pub use session::{DiagnosticsSink, Engine, Session, SessionOptions};

use tower_lsp::{LspService, Server};

/// Start the LSP server.
///
/// This function sets up stdin/stdout communication and runs the server
/// until shutdown is requested.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters a fatal error.
pub async fn start_server() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new)
        .custom_method(SCHEMA_ASSOCIATIONS_METHOD, Backend::schema_associations)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}
