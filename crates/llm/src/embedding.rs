//! Embedding provider trait.
//!
//! The embedding model is an external collaborator: this module defines the
//! order-preserving batch contract, not any embedding logic.

use docgraph_core::{AppError, AppResult};

/// Task-type hint passed to the provider alongside the texts.
///
/// Retrieval-tuned models embed documents and queries differently; the hint
/// selects which side of the contract a call is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// Embedding passages for storage in the index.
    RetrievalDocument,
    /// Embedding a query for similarity search.
    RetrievalQuery,
}

impl TaskType {
    /// Wire representation used by the provider API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            Self::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

/// Trait for embedding providers.
///
/// The contract is a length- and order-preserving 1:1 mapping: output[i]
/// is the embedding of input[i]. Implementations batch internally if the
/// provider caps per-call sizes, and surface failures as
/// [`AppError::EmbeddingProvider`] without retrying on their own.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "google", "mock")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String], task: TaskType) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str, task: TaskType) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()], task).await?;
        results
            .pop()
            .ok_or_else(|| AppError::EmbeddingProvider("No embedding returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_wire_names() {
        assert_eq!(TaskType::RetrievalDocument.as_str(), "RETRIEVAL_DOCUMENT");
        assert_eq!(TaskType::RetrievalQuery.as_str(), "RETRIEVAL_QUERY");
    }
}
