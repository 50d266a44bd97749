//! Docgraph retrieval pipeline.
//!
//! Everything between raw documents and an answering agent:
//! - Heading-aware chunking of HTML and plain text (`chunker`)
//! - A cosine-similarity vector index with one-hop graph expansion
//!   (`store`)
//! - The ingest pipeline wiring chunker, embedder, and store (`ingest`)
//! - The retrieval tool producing context bundles (`retrieval`)

pub mod chunker;
pub mod document;
pub mod ingest;
pub mod retrieval;
pub mod store;

pub use chunker::{chunk, Chunk, ChunkOptions};
pub use document::{ContentType, Document};
pub use ingest::{IngestReport, Ingestor};
pub use retrieval::{ContextBundle, GraphRagTool};
pub use store::{
    cosine_similarity, EntryMetadata, GraphStore, IndexEntry, IndexStats, Relation, SearchHit,
    SearchOptions,
};
