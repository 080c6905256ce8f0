//! Gemini embedding provider.
//!
//! Talks to the Gemini REST embedding API. Document batches go through
//! `batchEmbedContents` with the `RETRIEVAL_DOCUMENT` task type; queries
//! use `embedContent` with `RETRIEVAL_QUERY`. Both modes map into the
//! same vector space, so one index serves both.
//!
//! API reference: https://ai.google.dev/gemini-api/docs/embeddings

use crate::embeddings::provider::EmbeddingProvider;
use async_trait::async_trait;
use docquery_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Gemini API base URL.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Maximum retry attempts for failed requests.
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds.
const INITIAL_BACKOFF_MS: u64 = 500;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Dimensions the API accepts for truncated output.
const VALID_DIMENSIONS: [usize; 3] = [768, 1536, 3072];

/// Gemini embedding provider using the hosted REST API.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    /// HTTP client for API requests
    client: reqwest::Client,
    /// API key sent via the x-goog-api-key header
    api_key: String,
    /// Model name (e.g., "gemini-embedding-001")
    model: String,
    /// Expected embedding dimensions
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbedPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<EmbedPart>,
}

/// One embedding request in the Gemini wire format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
    task_type: String,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    ///
    /// # Errors
    /// * `AppError::Config` - If the dimension is not supported by the API
    /// * `AppError::Embedding` - If the HTTP client cannot be built
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> AppResult<Self> {
        if !VALID_DIMENSIONS.contains(&dimensions) {
            return Err(AppError::Config(format!(
                "Invalid Gemini dimension: {}. Must be one of 768, 1536, 3072",
                dimensions
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Embedding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        })
    }

    fn embed_request(&self, text: &str, task_type: &str) -> EmbedRequest {
        EmbedRequest {
            model: format!("models/{}", self.model),
            content: EmbedContent {
                parts: vec![EmbedPart {
                    text: text.to_string(),
                }],
            },
            task_type: task_type.to_string(),
            output_dimensionality: self.dimensions,
        }
    }

    /// POST a JSON body with retry and exponential backoff.
    async fn post_with_retries<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> AppResult<R> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match self.post_once(url, body).await {
                Ok(parsed) => return Ok(parsed),
                Err(e) => {
                    last_error = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt + 1);
                        warn!(
                            "Embedding request failed (attempt {}/{}), retrying in {}ms",
                            attempt + 1,
                            MAX_RETRIES,
                            backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Embedding("Unknown embedding error".to_string())))
    }

    async fn post_once<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> AppResult<R> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Embedding(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse response: {}", e)))
    }

    fn check_dimensions(&self, embedding: &[f32]) -> AppResult<()> {
        if embedding.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "Gemini returned {} dimensions, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_documents(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Embedding batch of {} chunks", texts.len());

        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| self.embed_request(text, "RETRIEVAL_DOCUMENT"))
                .collect(),
        };
        let url = format!("{}/{}:batchEmbedContents", GEMINI_BASE_URL, self.model);

        let response: BatchEmbedResponse = self.post_with_retries(&url, &body).await?;

        if response.embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Gemini returned {} embeddings for {} chunks",
                response.embeddings.len(),
                texts.len()
            )));
        }

        let mut rows = Vec::with_capacity(response.embeddings.len());
        for embedding in response.embeddings {
            self.check_dimensions(&embedding.values)?;
            rows.push(embedding.values);
        }

        Ok(rows)
    }

    async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        let body = self.embed_request(text, "RETRIEVAL_QUERY");
        let url = format!("{}/{}:embedContent", GEMINI_BASE_URL, self.model);

        let response: EmbedResponse = self.post_with_retries(&url, &body).await?;
        self.check_dimensions(&response.embedding.values)?;

        Ok(response.embedding.values)
    }
}
