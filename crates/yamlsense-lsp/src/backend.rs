//! LSP backend implementation for yamlsense.
//!
//! Implements the Language Server Protocol using tower-lsp. Protocol events
//! are translated into [`Session`] operations; diagnostics flow back to the
//! client through a [`DiagnosticsSink`] that wraps the tower-lsp [`Client`].

use std::sync::Arc;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{info, warn};
use yamlsense_core::config::CONFIG_FILE_NAME;
use yamlsense_core::{SchemaAssociations, Settings, TextDocument};

use crate::client_config::ClientSettings;
use crate::completion_provider::to_completion_response;
use crate::diagnostic_mapper::{from_lsp_position, to_lsp_diagnostics};
use crate::hover_provider::{to_document_symbols, to_hover};
use crate::session::{DiagnosticsSink, Session, SessionOptions};

/// Name of the custom notification carrying schema associations.
pub const SCHEMA_ASSOCIATIONS_METHOD: &str = "json/schemaAssociations";

/// Publishes diagnostics to the connected client.
struct ClientSink {
    client: Client,
}

#[tower_lsp::async_trait]
impl DiagnosticsSink for ClientSink {
    async fn publish(
        &self,
        uri: Url,
        diagnostics: Vec<yamlsense_core::Diagnostic>,
        version: Option<i32>,
    ) {
        self.client
            .publish_diagnostics(uri, to_lsp_diagnostics(diagnostics), version)
            .await;
    }
}

/// LSP backend that handles YAML document requests.
///
/// Document state, schema configuration and debounced validation live in
/// the [`Session`]; the backend only adapts protocol types.
pub struct Backend {
    client: Client,
    session: Session,
}

impl Backend {
    /// Create a new backend instance with the given client connection.
    pub fn new(client: Client) -> Self {
        Self::with_options(client, SessionOptions::default())
    }

    pub fn with_options(client: Client, options: SessionOptions) -> Self {
        let sink = Arc::new(ClientSink {
            client: client.clone(),
        });
        Self {
            client,
            session: Session::new(options, sink),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Handler for the `json/schemaAssociations` notification.
    pub async fn schema_associations(&self, params: SchemaAssociations) {
        info!(patterns = params.len(), "schema associations received");
        self.session.update_associations(params).await;
    }

    /// Load `.yamlsense.toml` from the workspace root, if present.
    ///
    /// A broken file is reported to the client and the defaults are kept.
    async fn load_workspace_settings(&self) -> Option<Settings> {
        let root = self.session.workspace_root().await?;
        match Settings::load_from_workspace(&root) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "failed to load workspace settings");
                self.client
                    .log_message(
                        MessageType::WARNING,
                        format!("Failed to load {}: {}", CONFIG_FILE_NAME, e),
                    )
                    .await;
                None
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = params
            .root_uri
            .and_then(|uri| uri.to_file_path().ok())
            .or_else(|| {
                params
                    .workspace_folders
                    .as_ref()
                    .and_then(|folders| folders.first())
                    .and_then(|folder| folder.uri.to_file_path().ok())
            });
        self.session.set_workspace_root(root).await;

        if let Some(settings) = self.load_workspace_settings().await {
            self.session.update_settings(settings).await;
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![":".to_string(), " ".to_string()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "yamlsense-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "yamlsense-lsp initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.session.shutdown().await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let item = params.text_document;
        self.session
            .open(TextDocument::new(item.uri, item.version, item.text))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the whole text.
        if let Some(change) = params.content_changes.into_iter().last() {
            let id = params.text_document;
            self.session
                .change(TextDocument::new(id.uri, id.version, change.text))
                .await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        self.session.touch(&params.text_document.uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.session.close(&params.text_document.uri).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let Some(update) = ClientSettings::from_payload(&params.settings) else {
            self.client
                .log_message(MessageType::WARNING, "Ignoring invalid yaml settings")
                .await;
            return;
        };

        let mut settings = self.session.settings().await;
        update.merge_into_settings(&mut settings);
        self.session.update_settings(settings).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let uris: Vec<Url> = params.changes.into_iter().map(|change| change.uri).collect();
        self.session.watched_files_changed(&uris).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let position = params.text_document_position;
        Ok(self
            .session
            .completion(&position.text_document.uri, from_lsp_position(position.position))
            .await
            .map(to_completion_response))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params;
        Ok(self
            .session
            .hover(&position.text_document.uri, from_lsp_position(position.position))
            .await
            .map(to_hover))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let symbols = self.session.document_symbols(&params.text_document.uri).await;
        if symbols.is_empty() {
            return Ok(None);
        }
        Ok(Some(DocumentSymbolResponse::Nested(to_document_symbols(
            symbols,
        ))))
    }
}
