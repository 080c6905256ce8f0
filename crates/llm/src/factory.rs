//! LLM provider factory.
//!
//! This module provides a factory for creating LLM clients based on
//! application configuration. It handles provider resolution and secret
//! injection.

use crate::client::LlmClient;
use crate::providers::OpenAiCompatClient;
use docquery_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("groq", "openai")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key for the provider
///
/// # Returns
/// A shared trait object implementing `LlmClient`
///
/// # Errors
/// Returns error if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "groq" => {
            let api_key = api_key
                .ok_or_else(|| AppError::Config("Groq provider requires an API key".to_string()))?;
            let client = match endpoint {
                Some(url) => OpenAiCompatClient::with_base_url("groq", url, api_key)?,
                None => OpenAiCompatClient::groq(api_key)?,
            };
            Ok(Arc::new(client))
        }
        "openai" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI provider requires an API key".to_string())
            })?;
            let base_url = endpoint.unwrap_or("https://api.openai.com/v1");
            let client = OpenAiCompatClient::with_base_url("openai", base_url, api_key)?;
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!("Unknown provider: {}", provider))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_groq_client() {
        let client = create_client("groq", None, Some("key")).unwrap();
        assert_eq!(client.provider_name(), "groq");
    }

    #[test]
    fn test_create_openai_with_custom_endpoint() {
        let client = create_client("openai", Some("http://localhost:8080/v1"), Some("key"));
        assert!(client.is_ok());
    }

    #[test]
    fn test_groq_requires_api_key() {
        match create_client("groq", None, None) {
            Err(err) => assert!(err.to_string().contains("requires an API key")),
            Ok(_) => panic!("Expected error for Groq without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, Some("key")) {
            Err(err) => assert!(err.to_string().contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
