//! Source document model.

use serde::{Deserialize, Serialize};

/// Content type of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Html,
    Plain,
}

impl ContentType {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Plain => "plain",
        }
    }
}

/// A raw source document. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier (UUID v4)
    pub id: String,

    /// Raw source text or markup
    pub text: String,

    /// Content type tag
    pub content_type: ContentType,
}

impl Document {
    /// Create a document from HTML markup.
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            content_type: ContentType::Html,
        }
    }

    /// Create a document from plain text.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            content_type: ContentType::Plain,
        }
    }
}
