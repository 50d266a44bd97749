//! Completion client abstraction and request/response types.
//!
//! The chat model is an external collaborator: this module only defines the
//! interface contract and the payload types the agent hands over.

use docgraph_core::AppResult;
use serde::{Deserialize, Serialize};

/// Chat/completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// User prompt text (question + serialized tool context)
    pub prompt: String,

    /// Model identifier (e.g., "gemini-2.0-flash")
    pub model: String,

    /// System instructions (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a new completion request with required fields.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system: None,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Set the system instructions.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,
}

/// Trait for chat/completion providers.
///
/// Implementations must surface failures as
/// [`AppError::CompletionProvider`](docgraph_core::AppError) and never
/// retry internally — the orchestration layer owns retry policy.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Get the provider name (e.g., "google").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("question", "gemini-2.0-flash")
            .with_system("instructions")
            .with_temperature(0.3)
            .with_max_tokens(1000);

        assert_eq!(request.prompt, "question");
        assert_eq!(request.model, "gemini-2.0-flash");
        assert_eq!(request.system.as_deref(), Some("instructions"));
        assert_eq!(request.max_tokens, Some(1000));
    }
}
