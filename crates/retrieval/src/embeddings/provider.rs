//! Embedding provider trait and factory.

use docquery_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Implementations map text to fixed-dimension vectors. Document and
/// query encodings may use different task modes of the same model but
/// must land in one vector space; the index and coordinator stay
/// agnostic to which backend is plugged in as long as the declared
/// dimensionality holds.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "gemini", "trigram")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Embed a batch of document chunks.
    async fn embed_documents(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Embed a single query.
    ///
    /// Default implementation reuses document encoding; providers with a
    /// dedicated query mode override this.
    async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut rows = self.embed_documents(&[text.to_string()]).await?;
        rows.pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned for query".to_string()))
    }
}

/// Create an embedding provider by name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini", "trigram")
/// * `model` - Model identifier (provider-specific)
/// * `dimensions` - Expected embedding dimensions
/// * `api_key` - API key, required by remote providers
pub fn create_provider(
    provider: &str,
    model: &str,
    dimensions: usize,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match provider.to_lowercase().as_str() {
        "gemini" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("Gemini embedding provider requires an API key".to_string())
            })?;
            let provider =
                super::providers::gemini::GeminiProvider::new(api_key, model, dimensions)?;
            Ok(Arc::new(provider))
        }

        "trigram" => {
            let provider = super::providers::trigram::TrigramProvider::new(dimensions);
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: gemini, trigram",
            provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_trigram_provider() {
        let provider = create_provider("trigram", "trigram-v1", 384, None).unwrap();
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let result = create_provider("gemini", "gemini-embedding-001", 768, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_provider("unknown", "m", 384, None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_default_query_embedding_matches_dimensions() {
        let provider = create_provider("trigram", "trigram-v1", 384, None).unwrap();
        let embedding = provider.embed_query("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
