//! Google Generative Language API providers.
//!
//! Implements [`EmbeddingProvider`] over `batchEmbedContents` and
//! [`CompletionClient`] over `generateContent`. Both adapters use typed
//! request/response structs, a bounded request timeout, and retry with
//! exponential backoff on transport-level failures only — HTTP error
//! bodies are decoded and surfaced to the orchestrator, which owns the
//! retry-vs-fail decision for semantic failures.

use crate::client::{CompletionClient, CompletionRequest, CompletionResponse};
use crate::embedding::{EmbeddingProvider, TaskType};
use docgraph_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Maximum contents per batchEmbedContents call.
const MAX_BATCH_SIZE: usize = 100;

/// Retry attempts for transport failures.
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds.
const INITIAL_BACKOFF_MS: u64 = 200;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Gemini embedding provider.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: String,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GoogleProvider {
    /// Create a new provider for the given embedding model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: usize) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::EmbeddingProvider(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        })
    }

    /// Point the provider at a different API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Embed one sub-batch (≤ MAX_BATCH_SIZE texts), with transport retries.
    async fn embed_slice(&self, texts: &[String], task: TaskType) -> AppResult<Vec<Vec<f32>>> {
        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{}", self.model),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                    task_type: task.as_str().to_string(),
                })
                .collect(),
        };

        let mut attempt = 0;
        let response = loop {
            match self.client.post(&url).json(&request).send().await {
                Ok(response) => break response,
                Err(e) => {
                    attempt += 1;
                    if attempt >= MAX_RETRIES {
                        return Err(AppError::EmbeddingProvider(format!(
                            "Request failed after {} attempts: {}",
                            attempt, e
                        )));
                    }
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding request failed (attempt {}/{}), retrying in {}ms",
                        attempt, MAX_RETRIES, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AppError::EmbeddingProvider(format!(
                "API error ({}): {}",
                status, message
            )));
        }

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::EmbeddingProvider(format!("Failed to parse response: {}", e)))?;

        if body.embeddings.len() != texts.len() {
            return Err(AppError::EmbeddingProvider(format!(
                "Provider returned {} embeddings for {} texts",
                body.embeddings.len(),
                texts.len()
            )));
        }

        let mut vectors = Vec::with_capacity(body.embeddings.len());
        for embedding in body.embeddings {
            if embedding.values.len() != self.dimensions {
                return Err(AppError::EmbeddingProvider(format!(
                    "Unexpected embedding dimensions: got {}, expected {}",
                    embedding.values.len(),
                    self.dimensions
                )));
            }
            vectors.push(embedding.values);
        }

        Ok(vectors)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for GoogleProvider {
    fn provider_name(&self) -> &str {
        "google"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String], task: TaskType) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Embedding batch of {} texts ({})", texts.len(), task.as_str());

        // The API caps contents per call; sub-batch while preserving order.
        let mut vectors = Vec::with_capacity(texts.len());
        for slice in texts.chunks(MAX_BATCH_SIZE) {
            let mut batch = self.embed_slice(slice, task).await?;
            vectors.append(&mut batch);
        }

        Ok(vectors)
    }
}

/// Gemini chat client over generateContent.
#[derive(Debug, Clone)]
pub struct GoogleChatClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<RoleContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RoleContent {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

impl GoogleChatClient {
    /// Create a new chat client.
    pub fn new(api_key: impl Into<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::CompletionProvider(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Point the client at a different API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait::async_trait]
impl CompletionClient for GoogleChatClient {
    fn provider_name(&self) -> &str {
        "google"
    }

    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );

        let payload = GenerateContentRequest {
            system_instruction: request.system.as_ref().map(|text| Content {
                parts: vec![Part { text: text.clone() }],
            }),
            contents: vec![RoleContent {
                role: "user".to_string(),
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            }),
        };

        debug!("Sending completion request to model {}", request.model);

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::CompletionProvider(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AppError::CompletionProvider(format!(
                "API error ({}): {}",
                status, message
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::CompletionProvider(format!("Failed to parse response: {}", e)))?;

        let content = body
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| {
                AppError::CompletionProvider("Response contained no candidates".to_string())
            })?;

        Ok(CompletionResponse {
            content,
            model: request.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_metadata() {
        let provider = GoogleProvider::new("key", "gemini-embedding-exp-03-07", 768).unwrap();
        assert_eq!(provider.provider_name(), "google");
        assert_eq!(provider.model_name(), "gemini-embedding-exp-03-07");
        assert_eq!(provider.dimensions(), 768);
    }

    #[test]
    fn test_base_url_defaults_and_overrides() {
        let provider = GoogleProvider::new("key", "gemini-embedding-exp-03-07", 768).unwrap();
        assert_eq!(provider.base_url, DEFAULT_API_URL);

        let provider = provider.with_base_url("http://localhost:9090/v1beta");
        assert_eq!(provider.base_url, "http://localhost:9090/v1beta");

        let chat = GoogleChatClient::new("key")
            .unwrap()
            .with_base_url("http://localhost:9090/v1beta");
        assert_eq!(chat.base_url, "http://localhost:9090/v1beta");
    }

    #[test]
    fn test_batch_request_serialization() {
        let request = BatchEmbedRequest {
            requests: vec![EmbedContentRequest {
                model: "models/gemini-embedding-exp-03-07".to_string(),
                content: Content {
                    parts: vec![Part {
                        text: "hello".to_string(),
                    }],
                },
                task_type: TaskType::RetrievalQuery.as_str().to_string(),
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["requests"][0]["taskType"],
            serde_json::json!("RETRIEVAL_QUERY")
        );
        assert_eq!(
            json["requests"][0]["content"]["parts"][0]["text"],
            serde_json::json!("hello")
        );
    }

    #[tokio::test]
    async fn test_embed_empty_batch() {
        let provider = GoogleProvider::new("key", "gemini-embedding-exp-03-07", 768).unwrap();
        let result = provider
            .embed_batch(&[], TaskType::RetrievalDocument)
            .await
            .unwrap();
        assert!(result.is_empty());
    }
}
