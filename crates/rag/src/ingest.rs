//! Document ingestion: chunk, embed, index.

use crate::chunker::{self, ChunkOptions};
use crate::document::Document;
use crate::store::{EntryMetadata, GraphStore, IndexEntry};
use docgraph_core::{AppError, AppResult};
use docgraph_llm::{EmbeddingProvider, TaskType};
use std::sync::Arc;

/// Outcome of ingesting a batch of documents.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks_indexed: usize,
    pub elapsed_secs: f64,
}

/// Drives documents through the chunk, embed, upsert pipeline into one
/// index.
pub struct Ingestor {
    store: Arc<GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index_name: String,
    chunk_options: ChunkOptions,
}

impl Ingestor {
    pub fn new(
        store: Arc<GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        index_name: impl Into<String>,
        chunk_options: ChunkOptions,
    ) -> Self {
        Self {
            store,
            embedder,
            index_name: index_name.into(),
            chunk_options,
        }
    }

    /// Ingest one document.
    ///
    /// The upsert is atomic: embeddings for every chunk are gathered
    /// before the index is touched, so a failed embed leaves the index
    /// unchanged. An empty document ingests as zero chunks.
    pub async fn ingest(&self, document: &Document) -> AppResult<IngestReport> {
        let started = std::time::Instant::now();

        self.store
            .create_index(&self.index_name, self.embedder.dimensions())
            .await?;

        let chunks = chunker::chunk(document, &self.chunk_options)?;
        if chunks.is_empty() {
            tracing::info!("Document {} produced no chunks, nothing to index", document.id);
            return Ok(IngestReport {
                documents: 1,
                chunks_indexed: 0,
                elapsed_secs: started.elapsed().as_secs_f64(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts, TaskType::RetrievalDocument)
            .await?;

        if vectors.len() != chunks.len() {
            return Err(AppError::EmbeddingProvider(format!(
                "provider returned {} embeddings for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry {
                id: chunk.id,
                vector,
                metadata: EntryMetadata {
                    text: chunk.text,
                    heading_path: chunk.heading_path,
                },
            })
            .collect();
        let indexed = entries.len();

        self.store.upsert(&self.index_name, entries).await?;

        tracing::info!(
            "Ingested document {} as {} chunks into '{}'",
            document.id,
            indexed,
            self.index_name
        );
        Ok(IngestReport {
            documents: 1,
            chunks_indexed: indexed,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }

    /// Ingest a batch of documents, stopping at the first failure.
    pub async fn ingest_all(&self, documents: &[Document]) -> AppResult<IngestReport> {
        let mut report = IngestReport::default();
        for document in documents {
            let one = self.ingest(document).await?;
            report.documents += one.documents;
            report.chunks_indexed += one.chunks_indexed;
            report.elapsed_secs += one.elapsed_secs;
        }
        Ok(report)
    }
}
