//! Integration tests for yamlsense-lsp.
//!
//! These tests drive a [`Session`] with the default YAML engine against
//! schemas on disk, and check the tower-lsp service wiring.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tower_lsp::lsp_types::Url;
use yamlsense_core::{Diagnostic, Position, SchemaSetting, Settings, Severity, TextDocument};
use yamlsense_lsp::{DiagnosticsSink, Session, SessionOptions};

type Published = (Url, Vec<Diagnostic>, Option<i32>);

#[derive(Default)]
struct RecordingSink {
    published: Mutex<Vec<Published>>,
}

impl RecordingSink {
    fn last_for(&self, uri: &Url) -> Option<Vec<Diagnostic>> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(u, _, _)| u == uri)
            .map(|(_, diagnostics, _)| diagnostics.clone())
    }

    fn count_for(&self, uri: &Url) -> usize {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _, _)| u == uri)
            .count()
    }
}

#[tower_lsp::async_trait]
impl DiagnosticsSink for RecordingSink {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.published.lock().unwrap().push((uri, diagnostics, version));
    }
}

fn new_session() -> (Session, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let options = SessionOptions {
        debounce: Duration::from_millis(20),
        ..SessionOptions::default()
    };
    (Session::new(options, sink.clone()), sink)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

fn write_schema(dir: &Path, schema: serde_json::Value) -> Url {
    let path = dir.join("schema.json");
    std::fs::write(&path, schema.to_string()).unwrap();
    Url::from_file_path(path).unwrap()
}

fn settings_for(schema_url: &str, pattern: &str) -> Settings {
    Settings {
        schemas: vec![SchemaSetting::new(schema_url, &[pattern])],
        ..Settings::default()
    }
}

fn document(dir: &Path, name: &str, version: i32, text: &str) -> TextDocument {
    TextDocument::new(Url::from_file_path(dir.join(name)).unwrap(), version, text)
}

mod validation_tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_schema_violation_is_published_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write_schema(
            dir.path(),
            json!({
                "type": "object",
                "properties": { "replicas": { "type": "integer" } },
                "required": ["name"]
            }),
        );
        let (session, sink) = new_session();
        session
            .update_settings(settings_for(schema.as_str(), "*.yaml"))
            .await;

        let doc = document(dir.path(), "app.yaml", 1, "replicas: lots\n");
        let uri = doc.uri.clone();
        session.open(doc).await;
        settle().await;

        let diagnostics = sink.last_for(&uri).expect("diagnostics published");
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.severity == Severity::Error));
        assert!(diagnostics.iter().any(|d| d.message.contains("name")));
        let replicas = diagnostics
            .iter()
            .find(|d| d.range.start.character == 0 && d.range.end.character == 8)
            .expect("type error reported on the key");
        assert_eq!(replicas.schema.as_deref(), Some(schema.as_str()));
    }

    #[tokio::test]
    async fn test_relative_schema_url_resolves_against_workspace_root() {
        let dir = tempfile::tempdir().unwrap();
        write_schema(dir.path(), json!({ "type": "object", "required": ["kind"] }));
        let (session, sink) = new_session();
        session.set_workspace_root(Some(dir.path().to_path_buf())).await;
        session
            .update_settings(settings_for("./schema.json", "*.yaml"))
            .await;

        let doc = document(dir.path(), "app.yaml", 1, "name: x\n");
        let uri = doc.uri.clone();
        session.open(doc).await;
        settle().await;

        let diagnostics = sink.last_for(&uri).expect("diagnostics published");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("kind"));
    }

    #[tokio::test]
    async fn test_multi_document_errors_point_into_their_section() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write_schema(
            dir.path(),
            json!({ "properties": { "port": { "type": "integer" } } }),
        );
        let (session, sink) = new_session();
        session
            .update_settings(settings_for(schema.as_str(), "*.yaml"))
            .await;

        let doc = document(dir.path(), "multi.yaml", 1, "port: 80\n---\nport: http\n");
        let uri = doc.uri.clone();
        session.open(doc).await;
        settle().await;

        let diagnostics = sink.last_for(&uri).expect("diagnostics published");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start, Position::new(2, 0));
    }

    #[tokio::test]
    async fn test_syntax_error_without_schema() {
        let dir = tempfile::tempdir().unwrap();
        let (session, sink) = new_session();

        let doc = document(dir.path(), "broken.yaml", 1, "key: [1, 2\n");
        let uri = doc.uri.clone();
        session.open(doc).await;
        settle().await;

        let diagnostics = sink.last_for(&uri).expect("diagnostics published");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_unreadable_schema_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Url::from_file_path(dir.path().join("missing.json")).unwrap();
        let (session, sink) = new_session();
        session
            .update_settings(settings_for(missing.as_str(), "*.yaml"))
            .await;

        let doc = document(dir.path(), "app.yaml", 1, "a: 1\n");
        let uri = doc.uri.clone();
        session.open(doc).await;
        settle().await;

        assert_eq!(sink.count_for(&uri), 0);
    }

    #[tokio::test]
    async fn test_schema_file_change_revalidates_open_documents() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write_schema(dir.path(), json!({ "type": "object" }));
        let (session, sink) = new_session();
        session
            .update_settings(settings_for(schema.as_str(), "*.yaml"))
            .await;

        let doc = document(dir.path(), "app.yaml", 1, "a: 1\n");
        let uri = doc.uri.clone();
        session.open(doc).await;
        settle().await;
        assert_eq!(sink.last_for(&uri), Some(Vec::new()));

        write_schema(dir.path(), json!({ "type": "object", "required": ["b"] }));
        assert!(session.watched_files_changed(&[schema.clone()]).await);
        settle().await;

        assert_eq!(sink.count_for(&uri), 2);
        let diagnostics = sink.last_for(&uri).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("\"b\""));
    }
}

mod request_tests {
    use super::*;
    use serde_json::json;

    fn deployment_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "metadata": {
                    "type": "object",
                    "description": "Standard object metadata",
                    "properties": {
                        "name": { "type": "string", "description": "Resource name" },
                        "labels": { "type": "object" }
                    }
                },
                "spec": { "$ref": "#/definitions/Spec" }
            },
            "definitions": {
                "Spec": {
                    "type": "object",
                    "properties": {
                        "paused": { "type": "boolean" },
                        "strategy": { "enum": ["Recreate", "RollingUpdate"] }
                    }
                }
            }
        })
    }

    async fn session_with_schema(dir: &Path) -> Session {
        let schema = write_schema(dir, deployment_schema());
        let (session, _sink) = new_session();
        session
            .update_settings(settings_for(schema.as_str(), "*.yaml"))
            .await;
        session
    }

    #[tokio::test]
    async fn test_completion_on_blank_nested_line() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_schema(dir.path()).await;
        let doc = document(dir.path(), "app.yaml", 1, "metadata:\n  name: web\n  \n");
        let uri = doc.uri.clone();
        session.open(doc).await;

        let list = session
            .completion(&uri, Position::new(2, 2))
            .await
            .expect("completion list");

        let labels: Vec<_> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["labels"]);
    }

    #[tokio::test]
    async fn test_value_completion_through_ref() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_schema(dir.path()).await;
        let doc = document(dir.path(), "app.yaml", 1, "spec:\n  strategy: \n");
        let uri = doc.uri.clone();
        session.open(doc).await;

        let list = session
            .completion(&uri, Position::new(1, 12))
            .await
            .expect("completion list");

        let labels: Vec<_> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["Recreate", "RollingUpdate"]);
    }

    #[tokio::test]
    async fn test_hover_on_nested_key() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_schema(dir.path()).await;
        let doc = document(dir.path(), "app.yaml", 1, "metadata:\n  name: web\n");
        let uri = doc.uri.clone();
        session.open(doc).await;

        let hover = session
            .hover(&uri, Position::new(1, 3))
            .await
            .expect("hover");

        assert!(hover.markdown.contains("Resource name"));
        assert!(hover.markdown.contains("schema.json"));
    }

    #[tokio::test]
    async fn test_hover_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_schema(dir.path()).await;
        let mut settings = session.settings().await;
        settings.hover = false;
        session.update_settings(settings).await;
        let doc = document(dir.path(), "app.yaml", 1, "metadata:\n  name: web\n");
        let uri = doc.uri.clone();
        session.open(doc).await;

        assert!(session.hover(&uri, Position::new(1, 3)).await.is_none());
    }

    #[tokio::test]
    async fn test_document_symbols_outline() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _sink) = new_session();
        let doc = document(
            dir.path(),
            "app.yaml",
            1,
            "metadata:\n  name: web\nspec:\n  paused: true\n",
        );
        let uri = doc.uri.clone();
        session.open(doc).await;

        let symbols = session.document_symbols(&uri).await;

        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["metadata", "spec"]);
        assert_eq!(symbols[1].children[0].name, "paused");
    }
}

mod service_tests {
    use tower_lsp::lsp_types::*;
    use tower_lsp::{LanguageServer, LspService};
    use yamlsense_lsp::{Backend, SCHEMA_ASSOCIATIONS_METHOD};

    #[tokio::test]
    async fn test_service_with_custom_notification_builds() {
        let (service, _socket) = LspService::build(Backend::new)
            .custom_method(SCHEMA_ASSOCIATIONS_METHOD, Backend::schema_associations)
            .finish();

        let result = service.inner().initialize(InitializeParams::default()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_initialized_completes() {
        let (service, _socket) = LspService::new(Backend::new);

        service.inner().initialized(InitializedParams {}).await;
    }
}
