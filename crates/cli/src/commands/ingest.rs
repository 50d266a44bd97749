//! Ingest command handler.

use clap::Args;
use docgraph_core::{AppConfig, AppError, AppResult};
use docgraph_rag::{ChunkOptions, Document, Ingestor};
use std::path::{Path, PathBuf};

/// Chunk, embed, and index documents
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files to ingest (.html/.htm are parsed as markup, everything
    /// else as plain text)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Force a content type instead of inferring it from the extension
    #[arg(long, value_parser = ["html", "plain"])]
    pub content_type: Option<String>,

    /// Override the maximum chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Ingesting {} file(s)", self.files.len());

        let mut documents = Vec::with_capacity(self.files.len());
        for path in &self.files {
            let text = std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            documents.push(self.to_document(path, text));
        }

        let store = super::open_store(config)?;
        let embedder = super::embedding_provider(config)?;

        let chunk_options = ChunkOptions {
            max_size: self.chunk_size.unwrap_or(config.chunk_max_size),
            ..Default::default()
        };
        let ingestor = Ingestor::new(store, embedder, &config.index_name, chunk_options);

        let report = ingestor.ingest_all(&documents).await?;

        if self.json {
            let output = serde_json::json!({
                "documents": report.documents,
                "chunksIndexed": report.chunks_indexed,
                "index": config.index_name,
                "elapsedSecs": report.elapsed_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} document(s) as {} chunk(s) into '{}' in {:.2}s",
                report.documents, report.chunks_indexed, config.index_name, report.elapsed_secs
            );
        }

        Ok(())
    }

    fn to_document(&self, path: &Path, text: String) -> Document {
        let html = match self.content_type.as_deref() {
            Some("html") => true,
            Some(_) => false,
            None => matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("html") | Some("htm")
            ),
        };
        if html {
            Document::html(text)
        } else {
            Document::plain(text)
        }
    }
}
