//! Heading-aware semantic chunking.
//!
//! Splits a document into passages suitable for embedding. Structured
//! (HTML) documents are segmented along heading and section boundaries
//! first; every chunk records the stack of enclosing headings. Plain
//! documents are treated as a single unheaded section.

mod html;
mod split;

use crate::document::{ContentType, Document};
use docgraph_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Options controlling the chunker.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Maximum chunk size in characters. Must be positive.
    pub max_size: usize,

    /// Ordered (tag, role) pairs marking section headings, outermost
    /// first. The tag's position in this list is its heading level.
    pub heading_selectors: Vec<(String, String)>,

    /// (tag, role) pairs naming container elements that scope extraction.
    /// When none of these tags occur in the document, the whole document
    /// is in scope.
    pub section_selectors: Vec<(String, String)>,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_size: 1000,
            heading_selectors: vec![
                ("h1".to_string(), "title".to_string()),
                ("h2".to_string(), "subtitle".to_string()),
            ],
            section_selectors: vec![("article".to_string(), "main".to_string())],
        }
    }
}

/// A bounded passage of a document, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier, stable for a given document: `{document_id}:{order_index}`
    pub id: String,

    /// Passage text
    pub text: String,

    /// Position in the document's chunk sequence, 0-based and
    /// monotonically increasing; used for adjacency.
    pub order_index: u32,

    /// Titles of the enclosing headings, outermost first. Empty for
    /// documents without headings.
    pub heading_path: Vec<String>,

    /// Byte range of the source region this chunk was drawn from.
    /// Exact for plain text; section-granular for markup, where entity
    /// decoding and whitespace normalization shift offsets.
    pub source_span: (usize, usize),
}

/// Section of extracted text sharing one heading path.
#[derive(Debug, Clone)]
pub(crate) struct Section {
    pub heading_path: Vec<String>,
    pub text: String,
    pub span: (usize, usize),
}

/// Chunk a document into an ordered sequence of passages.
///
/// Deterministic: the same document and options always produce the same
/// sequence. An empty document produces an empty sequence, not an error.
pub fn chunk(document: &Document, options: &ChunkOptions) -> AppResult<Vec<Chunk>> {
    if options.max_size == 0 {
        return Err(AppError::Config(
            "chunk max_size must be a positive integer".to_string(),
        ));
    }

    if document.text.trim().is_empty() {
        return Ok(vec![]);
    }

    let sections = match document.content_type {
        ContentType::Html => html::extract_sections(&document.text, options)?,
        ContentType::Plain => vec![Section {
            heading_path: vec![],
            text: document.text.clone(),
            span: (0, document.text.len()),
        }],
    };

    let mut chunks = Vec::new();
    let mut order_index = 0u32;

    for section in &sections {
        let exact_spans = matches!(document.content_type, ContentType::Plain);

        for (text, range) in split::split_section(&section.text, options.max_size) {
            let source_span = if exact_spans {
                (section.span.0 + range.0, section.span.0 + range.1)
            } else {
                section.span
            };

            chunks.push(Chunk {
                id: format!("{}:{}", document.id, order_index),
                text,
                order_index,
                heading_path: section.heading_path.clone(),
                source_span,
            });
            order_index += 1;
        }
    }

    tracing::debug!(
        "Chunked document {} into {} chunks across {} sections",
        document.id,
        chunks.len(),
        sections.len()
    );

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize_ws(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_document_yields_no_chunks() {
        let doc = Document::plain("");
        let chunks = chunk(&doc, &ChunkOptions::default()).unwrap();
        assert!(chunks.is_empty());

        let doc = Document::html("   \n  ");
        let chunks = chunk(&doc, &ChunkOptions::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let doc = Document::plain("text");
        let options = ChunkOptions {
            max_size: 0,
            ..Default::default()
        };
        assert!(chunk(&doc, &options).is_err());
    }

    #[test]
    fn test_order_index_monotonic_from_zero() {
        let doc = Document::plain("word ".repeat(500));
        let options = ChunkOptions {
            max_size: 100,
            ..Default::default()
        };

        let chunks = chunk(&doc, &options).unwrap();
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.order_index, i as u32);
        }
    }

    #[test]
    fn test_determinism() {
        let doc = Document::html(
            "<article><h1>Title</h1><p>First paragraph here.</p>\
             <h2>Sub</h2><p>Second paragraph with more text.</p></article>",
        );
        let options = ChunkOptions::default();

        let a = chunk(&doc, &options).unwrap();
        let b = chunk(&doc, &options).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_plain_document_has_empty_heading_paths() {
        let doc = Document::plain("sentence one. ".repeat(200));
        let options = ChunkOptions {
            max_size: 200,
            ..Default::default()
        };

        let chunks = chunk(&doc, &options).unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.heading_path.is_empty()));
    }

    #[test]
    fn test_html_without_headings_has_empty_heading_paths() {
        let doc = Document::html("<div><p>Just a paragraph.</p><p>Another one.</p></div>");
        let chunks = chunk(&doc, &ChunkOptions::default()).unwrap();

        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.heading_path.is_empty()));
    }

    #[test]
    fn test_heading_path_tracks_nesting() {
        let doc = Document::html(
            "<h1>Guide</h1><p>Intro text.</p>\
             <h2>Setup</h2><p>Setup text.</p>\
             <h2>Usage</h2><p>Usage text.</p>",
        );
        let chunks = chunk(&doc, &ChunkOptions::default()).unwrap();

        let intro = chunks.iter().find(|c| c.text.contains("Intro")).unwrap();
        assert_eq!(intro.heading_path, vec!["Guide"]);

        let setup = chunks.iter().find(|c| c.text.contains("Setup text")).unwrap();
        assert_eq!(setup.heading_path, vec!["Guide", "Setup"]);

        let usage = chunks.iter().find(|c| c.text.contains("Usage text")).unwrap();
        assert_eq!(usage.heading_path, vec!["Guide", "Usage"]);
    }

    #[test]
    fn test_section_selector_scopes_extraction() {
        let doc = Document::html(
            "<nav><p>Navigation junk</p></nav>\
             <article><p>Real content.</p></article>\
             <footer><p>Footer junk</p></footer>",
        );
        let chunks = chunk(&doc, &ChunkOptions::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Real content"));
        assert!(!chunks.iter().any(|c| c.text.contains("junk")));
    }

    #[test]
    fn test_max_size_respected() {
        let doc = Document::plain("a sentence of words here. ".repeat(100));
        let options = ChunkOptions {
            max_size: 120,
            ..Default::default()
        };

        let chunks = chunk(&doc, &options).unwrap();
        for c in &chunks {
            assert!(
                c.text.chars().count() <= 120,
                "chunk of {} chars exceeds max_size",
                c.text.chars().count()
            );
        }
    }

    #[test]
    fn test_plain_coverage_is_lossless() {
        let text = "First paragraph of prose.\n\nSecond paragraph, a bit longer, \
                    with several sentences. Sentence two. Sentence three.\n\nThird."
            .repeat(5);
        let doc = Document::plain(text.clone());
        let options = ChunkOptions {
            max_size: 80,
            ..Default::default()
        };

        let chunks = chunk(&doc, &options).unwrap();
        let rebuilt = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        assert_eq!(normalize_ws(&rebuilt), normalize_ws(&text));
    }

    #[test]
    fn test_plain_spans_index_source() {
        let text = "alpha beta gamma. ".repeat(50);
        let doc = Document::plain(text.clone());
        let options = ChunkOptions {
            max_size: 60,
            ..Default::default()
        };

        for c in chunk(&doc, &options).unwrap() {
            assert_eq!(&text[c.source_span.0..c.source_span.1], c.text);
        }
    }

    #[test]
    fn test_unterminated_tag_is_parse_error() {
        let doc = Document::html("<article><p>fine</p><div class=\"never closed");
        let result = chunk(&doc, &ChunkOptions::default());
        assert!(matches!(result, Err(docgraph_core::AppError::Parse(_))));
    }

    #[test]
    fn test_stray_close_tag_degrades_gracefully() {
        let doc = Document::html("<p>before</p></span><p>after</p>");
        let chunks = chunk(&doc, &ChunkOptions::default()).unwrap();
        let all: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert!(all.contains("before"));
        assert!(all.contains("after"));
    }
}
