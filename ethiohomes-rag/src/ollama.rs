//! Ollama embedding and generation providers over the local REST API.
//!
//! This module is only available when the `ollama` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

/// The default Ollama server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "mxbai-embed-large";

/// Dimensionality of `mxbai-embed-large`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1024;

/// The default generation model.
pub const DEFAULT_GENERATION_MODEL: &str = "llama3.2";

/// Connection and model settings shared by both providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub generation_model: String,
    /// Sampling temperature for generation.
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            temperature: 0.3,
        }
    }
}

impl OllamaConfig {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Read an error body, preferring Ollama's `{"error": ...}` message.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
    format!("API returned {status}: {detail}")
}

// ── EmbeddingProvider implementation ───────────────────────────────

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaEmbeddingProvider {
    pub fn new(config: OllamaConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    /// Share an existing HTTP client.
    pub fn with_client(client: reqwest::Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }

    fn err(&self, message: String) -> RagError {
        RagError::EmbeddingError {
            provider: format!("Ollama/{}", self.config.embedding_model),
            message,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Ollama", text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| self.err("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = "Ollama",
            batch_size = texts.len(),
            model = %self.config.embedding_model,
            "embedding batch"
        );

        let request_body =
            EmbedRequest { model: &self.config.embedding_model, input: texts.to_vec() };

        let response = self
            .client
            .post(self.config.endpoint("api/embed"))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Ollama", error = %e, "embedding request failed");
                self.err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(provider = "Ollama", %detail, "embedding API error");
            return Err(self.err(detail));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse embedding response");
            self.err(format!("failed to parse response: {e}"))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(self.err(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.embedding_model
    }
}

// ── GenerationProvider implementation ──────────────────────────────

/// A [`GenerationProvider`] backed by Ollama's non-streaming `/api/generate` endpoint.
pub struct OllamaGenerationProvider {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaGenerationProvider {
    pub fn new(config: OllamaConfig) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    /// Share an existing HTTP client.
    pub fn with_client(client: reqwest::Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }

    fn err(&self, message: String) -> RagError {
        RagError::GenerationError {
            provider: format!("Ollama/{}", self.config.generation_model),
            message,
        }
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerationProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            provider = "Ollama",
            model = %self.config.generation_model,
            prompt_len = prompt.len(),
            "generating"
        );

        let request_body = GenerateRequest {
            model: &self.config.generation_model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: self.config.temperature },
        };

        let response = self
            .client
            .post(self.config.endpoint("api/generate"))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Ollama", error = %e, "generation request failed");
                self.err(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(provider = "Ollama", %detail, "generation API error");
            return Err(self.err(detail));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse generation response");
            self.err(format!("failed to parse response: {e}"))
        })?;
        Ok(parsed.response)
    }

    fn model_name(&self) -> &str {
        &self.config.generation_model
    }
}
