//! Open text documents.

use url::Url;

/// A document as the editor currently sees it.
///
/// `version` increases with every edit; cached data derived from a document is
/// only valid for the version it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub uri: Url,
    pub version: i32,
    pub text: String,
}

impl TextDocument {
    pub fn new(uri: Url, version: i32, text: impl Into<String>) -> Self {
        Self {
            uri,
            version,
            text: text.into(),
        }
    }

    /// Same document identity and version, different text.
    ///
    /// Used for completion, which runs against a repaired copy of the buffer.
    pub fn with_text(&self, text: String) -> Self {
        Self {
            uri: self.uri.clone(),
            version: self.version,
            text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
