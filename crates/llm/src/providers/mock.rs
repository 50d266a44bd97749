//! Deterministic mock embedding provider for tests.
//!
//! Produces content-aware vectors from character trigram hashes, so texts
//! with shared vocabulary land near each other in cosine space without any
//! network dependency. Identical input always yields identical output.

use crate::embedding::{EmbeddingProvider, TaskType};
use docgraph_core::AppResult;

/// Mock embedding provider with configurable dimensions.
#[derive(Debug, Clone)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    /// Create a mock provider producing vectors of the given dimension.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        for word in lower.split_whitespace().filter(|w| w.len() > 2) {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let hash = window
                    .iter()
                    .collect::<String>()
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(37).wrapping_add(b as u64));
                embedding[(hash as usize) % self.dimensions] += 1.0;
            }

            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            embedding[(word_hash as usize) % self.dimensions] += 1.0;
        }

        // Normalize to unit vector
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String], _task: TaskType) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
