//! Cosine-similarity vector index with one-hop graph expansion.
//!
//! Indexes are fixed-dimension and held in memory, with an optional
//! SQLite mirror for durability. Search returns the top-k nearest
//! entries by cosine similarity, then widens the result by one hop:
//! entries whose similarity to a direct hit meets the edge threshold
//! are appended, labelled by their relation to the query.
//!
//! Concurrency: searches on one index run concurrently behind a shared
//! lock; upserts take the exclusive side, so a search observes either
//! all of a batch or none of it.

mod distance;
mod persist;

pub use distance::cosine_similarity;

use docgraph_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Metadata carried alongside each indexed vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Chunk text
    pub text: String,

    /// Titles of the enclosing headings, outermost first
    #[serde(default)]
    pub heading_path: Vec<String>,
}

/// An entry to insert or replace in an index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: EntryMetadata,
}

/// How a search hit relates to the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Among the top-k nearest to the query vector
    Direct,
    /// Reached via a graph edge from a direct hit
    Expanded,
}

/// One search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    /// Cosine similarity between this entry's vector and the query
    pub score: f32,
    pub relation: Relation,
    pub metadata: EntryMetadata,
}

/// Search tuning parameters.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Number of direct hits to return
    pub top_k: usize,

    /// Minimum cosine similarity between two entries for a graph edge
    pub graph_threshold: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            graph_threshold: docgraph_core::config::DEFAULT_GRAPH_THRESHOLD,
        }
    }
}

/// Size and shape of one index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub name: String,
    pub dimension: usize,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: EntryMetadata,
}

/// In-memory state of one index. Entries keep insertion order; replacing
/// an id keeps its original slot, so tie-breaks stay stable across
/// upserts.
pub(crate) struct IndexState {
    name: String,
    dimension: usize,
    entries: Vec<StoredEntry>,
    by_id: HashMap<String, usize>,
}

impl IndexState {
    pub(crate) fn new(name: String, dimension: usize) -> Self {
        Self {
            name,
            dimension,
            entries: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, entry: StoredEntry) -> usize {
        match self.by_id.get(&entry.id) {
            Some(&pos) => {
                self.entries[pos] = entry;
                pos
            }
            None => {
                let pos = self.entries.len();
                self.by_id.insert(entry.id.clone(), pos);
                self.entries.push(entry);
                pos
            }
        }
    }
}

/// The vector index registry.
pub struct GraphStore {
    indexes: RwLock<HashMap<String, Arc<RwLock<IndexState>>>>,
    db: Option<Mutex<rusqlite::Connection>>,
}

impl GraphStore {
    /// Open a store backed by a SQLite file, replaying persisted indexes.
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = persist::open_db(path)?;
        let states = persist::load_all(&conn)?;

        let mut indexes = HashMap::new();
        for (name, state) in states {
            indexes.insert(name, Arc::new(RwLock::new(state)));
        }

        tracing::info!(
            "Opened vector store at {} with {} index(es)",
            path.display(),
            indexes.len()
        );

        Ok(Self {
            indexes: RwLock::new(indexes),
            db: Some(Mutex::new(conn)),
        })
    }

    /// Open an ephemeral in-memory store.
    pub fn in_memory() -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
            db: None,
        }
    }

    /// Create an index with a fixed dimension.
    ///
    /// Creating an index that already exists with the same dimension is a
    /// no-op; with a different dimension it is an error.
    pub async fn create_index(&self, name: &str, dimension: usize) -> AppResult<()> {
        if dimension == 0 {
            return Err(AppError::Config(
                "index dimension must be a positive integer".to_string(),
            ));
        }

        let mut indexes = self.indexes.write().await;
        if let Some(existing) = indexes.get(name) {
            let existing_dim = existing.read().await.dimension;
            if existing_dim != dimension {
                return Err(AppError::DimensionMismatch {
                    index: name.to_string(),
                    expected: existing_dim,
                    actual: dimension,
                });
            }
            return Ok(());
        }

        if let Some(db) = &self.db {
            let conn = lock_db(db)?;
            persist::save_index(&conn, name, dimension)?;
        }

        indexes.insert(
            name.to_string(),
            Arc::new(RwLock::new(IndexState::new(name.to_string(), dimension))),
        );
        tracing::info!("Created index '{}' with dimension {}", name, dimension);
        Ok(())
    }

    /// Insert or replace a batch of entries.
    ///
    /// Atomic with respect to search: every vector is validated against
    /// the index dimension before any entry is applied, and the whole
    /// batch lands inside one exclusive section. The durable mirror is
    /// committed before the in-memory state is touched, so on any error
    /// the index is unchanged — searches never observe entries the
    /// caller was told failed to ingest.
    pub async fn upsert(&self, index_name: &str, batch: Vec<IndexEntry>) -> AppResult<()> {
        let index = self.get_index(index_name).await?;
        let mut state = index.write().await;

        for entry in &batch {
            if entry.vector.len() != state.dimension {
                return Err(AppError::DimensionMismatch {
                    index: index_name.to_string(),
                    expected: state.dimension,
                    actual: entry.vector.len(),
                });
            }
        }

        // Stage: assign each entry the slot it will occupy, without
        // mutating the index. Replacements keep their original slot;
        // new ids are appended, a repeated new id reusing its first
        // assignment.
        let mut staged: Vec<(StoredEntry, usize)> = Vec::with_capacity(batch.len());
        let mut pending: HashMap<String, usize> = HashMap::new();
        let mut next = state.entries.len();
        for entry in batch {
            let stored = StoredEntry {
                id: entry.id,
                vector: entry.vector,
                metadata: entry.metadata,
            };
            let pos = if let Some(&pos) = state.by_id.get(&stored.id) {
                pos
            } else if let Some(&pos) = pending.get(&stored.id) {
                pos
            } else {
                let pos = next;
                next += 1;
                pending.insert(stored.id.clone(), pos);
                pos
            };
            staged.push((stored, pos));
        }

        if let Some(db) = &self.db {
            let mut conn = lock_db(db)?;
            persist::save_entries(&mut conn, index_name, &staged)?;
        }

        let count = staged.len();
        for (stored, _) in staged {
            state.insert(stored);
        }

        tracing::debug!(
            "Upserted {} entries into '{}' ({} total)",
            count,
            index_name,
            state.entries.len()
        );
        Ok(())
    }

    /// Top-k cosine search with one-hop graph expansion.
    ///
    /// Direct hits come first, ordered by score descending with ties
    /// broken by insertion order; expanded hits follow under the same
    /// ordering. An entry appears at most once, and expansion never
    /// recurses past one hop. Deterministic for a fixed index state.
    /// An unknown index yields an empty result, not an error.
    pub async fn search(
        &self,
        index_name: &str,
        query: &[f32],
        options: &SearchOptions,
    ) -> AppResult<Vec<SearchHit>> {
        let Some(index) = self.try_get_index(index_name).await else {
            return Ok(vec![]);
        };
        let state = index.read().await;

        if query.len() != state.dimension {
            return Err(AppError::DimensionMismatch {
                index: index_name.to_string(),
                expected: state.dimension,
                actual: query.len(),
            });
        }

        if state.entries.is_empty() || options.top_k == 0 {
            return Ok(vec![]);
        }

        // (insertion position, score) for every entry.
        let mut scored: Vec<(usize, f32)> = state
            .entries
            .iter()
            .enumerate()
            .map(|(pos, e)| (pos, cosine_similarity(query, &e.vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let direct: Vec<(usize, f32)> = scored.iter().take(options.top_k).copied().collect();
        let direct_set: HashSet<usize> = direct.iter().map(|(pos, _)| *pos).collect();

        // One hop out from each direct hit. Neighbor score is the
        // neighbor's own similarity to the query, not to the hit that
        // reached it.
        let mut expanded_set: HashSet<usize> = HashSet::new();
        for &(pos, _) in &direct {
            let hit_vector = &state.entries[pos].vector;
            for (neighbor_pos, neighbor) in state.entries.iter().enumerate() {
                if neighbor_pos == pos
                    || direct_set.contains(&neighbor_pos)
                    || expanded_set.contains(&neighbor_pos)
                {
                    continue;
                }
                if cosine_similarity(hit_vector, &neighbor.vector) >= options.graph_threshold {
                    expanded_set.insert(neighbor_pos);
                }
            }
        }

        let mut expanded: Vec<(usize, f32)> = expanded_set
            .into_iter()
            .map(|pos| (pos, scored_at(&scored, pos)))
            .collect();
        expanded.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let to_hit = |(pos, score): (usize, f32), relation: Relation| {
            let entry = &state.entries[pos];
            SearchHit {
                id: entry.id.clone(),
                score,
                relation,
                metadata: entry.metadata.clone(),
            }
        };

        let mut hits: Vec<SearchHit> = direct
            .into_iter()
            .map(|d| to_hit(d, Relation::Direct))
            .collect();
        hits.extend(expanded.into_iter().map(|e| to_hit(e, Relation::Expanded)));

        tracing::debug!(
            "Search on '{}' returned {} hits ({} direct)",
            index_name,
            hits.len(),
            hits.iter().filter(|h| h.relation == Relation::Direct).count()
        );
        Ok(hits)
    }

    /// Stats for one index.
    pub async fn stats(&self, index_name: &str) -> AppResult<IndexStats> {
        let index = self.get_index(index_name).await?;
        let state = index.read().await;
        Ok(IndexStats {
            name: state.name.clone(),
            dimension: state.dimension,
            entry_count: state.entries.len(),
        })
    }

    /// Stats for every index, sorted by name.
    pub async fn list_stats(&self) -> Vec<IndexStats> {
        let indexes = self.indexes.read().await;
        let mut stats = Vec::with_capacity(indexes.len());
        for index in indexes.values() {
            let state = index.read().await;
            stats.push(IndexStats {
                name: state.name.clone(),
                dimension: state.dimension,
                entry_count: state.entries.len(),
            });
        }
        drop(indexes);
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Remove an index and all of its entries.
    ///
    /// The durable mirror is cleared first; if that fails the index stays
    /// registered and usable.
    pub async fn drop_index(&self, name: &str) -> AppResult<()> {
        let mut indexes = self.indexes.write().await;
        if !indexes.contains_key(name) {
            return Err(AppError::Storage(format!("index '{name}' does not exist")));
        }

        if let Some(db) = &self.db {
            let conn = lock_db(db)?;
            persist::delete_index(&conn, name)?;
        }

        indexes.remove(name);
        tracing::info!("Dropped index '{}'", name);
        Ok(())
    }

    async fn try_get_index(&self, name: &str) -> Option<Arc<RwLock<IndexState>>> {
        self.indexes.read().await.get(name).cloned()
    }

    async fn get_index(&self, name: &str) -> AppResult<Arc<RwLock<IndexState>>> {
        self.try_get_index(name)
            .await
            .ok_or_else(|| AppError::Storage(format!("index '{name}' does not exist")))
    }
}

fn lock_db(db: &Mutex<rusqlite::Connection>) -> AppResult<std::sync::MutexGuard<'_, rusqlite::Connection>> {
    db.lock()
        .map_err(|_| AppError::Storage("database lock poisoned".to_string()))
}

fn scored_at(scored: &[(usize, f32)], pos: usize) -> f32 {
    scored
        .iter()
        .find(|(p, _)| *p == pos)
        .map(|(_, s)| *s)
        .unwrap_or(0.0)
}
