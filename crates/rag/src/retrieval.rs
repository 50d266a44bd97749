//! Graph-aware retrieval tool.
//!
//! Embeds a query, searches the index with one-hop expansion, and packs
//! the hits into a context bundle for the answering agent.

use crate::store::{GraphStore, Relation, SearchHit, SearchOptions};
use docgraph_core::{AppError, AppResult};
use docgraph_llm::{EmbeddingProvider, TaskType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Retrieved context for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBundle {
    pub query: String,
    pub hits: Vec<SearchHit>,
}

impl ContextBundle {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn direct_hits(&self) -> impl Iterator<Item = &SearchHit> {
        self.hits.iter().filter(|h| h.relation == Relation::Direct)
    }

    pub fn expanded_hits(&self) -> impl Iterator<Item = &SearchHit> {
        self.hits.iter().filter(|h| h.relation == Relation::Expanded)
    }
}

/// The retrieval tool: query embedding plus graph search over one index.
pub struct GraphRagTool {
    store: Arc<GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index_name: String,
    search_options: SearchOptions,
}

impl GraphRagTool {
    pub fn new(
        store: Arc<GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        index_name: impl Into<String>,
        search_options: SearchOptions,
    ) -> Self {
        Self {
            store,
            embedder,
            index_name: index_name.into(),
            search_options,
        }
    }

    /// Retrieve context for a query.
    ///
    /// An empty index or a query matching nothing yields an empty bundle,
    /// not an error.
    pub async fn retrieve(&self, query: &str) -> AppResult<ContextBundle> {
        let vector = self.embedder.embed(query, TaskType::RetrievalQuery).await?;
        let hits = self
            .store
            .search(&self.index_name, &vector, &self.search_options)
            .await?;

        tracing::debug!(
            "Retrieved {} hits for query ({} direct, {} expanded)",
            hits.len(),
            hits.iter().filter(|h| h.relation == Relation::Direct).count(),
            hits.iter().filter(|h| h.relation == Relation::Expanded).count(),
        );

        Ok(ContextBundle {
            query: query.to_string(),
            hits,
        })
    }

    /// Retrieve with a deadline covering the embed call and the search.
    ///
    /// On expiry the caller gets [`AppError::Cancelled`] and no partial
    /// bundle.
    pub async fn retrieve_with_deadline(
        &self,
        query: &str,
        deadline: Duration,
    ) -> AppResult<ContextBundle> {
        match tokio::time::timeout(deadline, self.retrieve(query)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Retrieval deadline of {:?} elapsed", deadline);
                Err(AppError::Cancelled)
            }
        }
    }
}
