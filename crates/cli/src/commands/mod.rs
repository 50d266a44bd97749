//! Command handlers.

mod ask;
mod ingest;
mod stats;

pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;

use docgraph_core::{AppConfig, AppResult};
use docgraph_llm::{EmbeddingProvider, GoogleProvider};
use docgraph_rag::GraphStore;
use std::sync::Arc;

/// Open the configured vector store.
pub(crate) fn open_store(config: &AppConfig) -> AppResult<Arc<GraphStore>> {
    Ok(Arc::new(GraphStore::open(&config.store_path)?))
}

/// Build the configured embedding provider.
pub(crate) fn embedding_provider(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let mut provider = GoogleProvider::new(
        config.api_key.clone(),
        config.embedding_model.clone(),
        config.dimension,
    )?;
    if let Some(url) = &config.api_url {
        provider = provider.with_base_url(url.clone());
    }
    Ok(Arc::new(provider))
}
