//! Provider adapters for docgraph.
//!
//! Defines the embedding and completion interfaces the pipeline depends on,
//! plus the Google Generative Language API implementations and a
//! deterministic mock for tests. Adapters report failures; they never
//! decide retry policy.

pub mod client;
pub mod embedding;
pub mod providers;

pub use client::{CompletionClient, CompletionRequest, CompletionResponse};
pub use embedding::{EmbeddingProvider, TaskType};
pub use providers::{GoogleChatClient, GoogleProvider, MockProvider};
