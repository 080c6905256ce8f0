//! OpenAI-compatible chat provider implementation.
//!
//! This module talks to any endpoint speaking the OpenAI chat-completions
//! protocol. The default base URL targets Groq's hosted API, which the
//! answer-generation path uses for fast open-weight models.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use docquery_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default base URL (Groq's OpenAI-compatible endpoint).
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Request timeout. Large documents produce long prompts, so this is
/// generous compared to typical chat traffic.
const REQUEST_TIMEOUT_SECS: u64 = 45;

/// Chat message in the OpenAI wire format.
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat-completions response body.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// OpenAI-compatible LLM client.
pub struct OpenAiCompatClient {
    /// Base URL for the chat API
    base_url: String,

    /// Provider label reported to callers
    provider: String,

    /// API key sent as a bearer token
    api_key: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a client against Groq's hosted endpoint.
    pub fn groq(api_key: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url("groq", DEFAULT_BASE_URL, api_key)
    }

    /// Create a client against a custom OpenAI-compatible endpoint.
    pub fn with_base_url(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            provider: provider.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Convert an LlmRequest to the chat wire format.
    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending chat completion request");

        let chat_request = self.to_chat_request(request);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send chat request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Chat API error ({}): {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse chat response: {}", e)))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("Chat response contained no choices".to_string()))?;

        let usage = chat_response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        tracing::debug!(
            total_tokens = usage.total_tokens,
            "Received chat completion"
        );

        Ok(LlmResponse {
            content: content.trim().to_string(),
            model: chat_response.model,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OpenAiCompatClient::groq("test-key").unwrap();
        assert_eq!(client.provider_name(), "groq");
        assert_eq!(client.base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client =
            OpenAiCompatClient::with_base_url("openai", "https://api.openai.com/v1/", "k").unwrap();
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_chat_request_conversion() {
        let client = OpenAiCompatClient::groq("test-key").unwrap();
        let request = LlmRequest::new("Hello", "llama3-70b-8192")
            .with_temperature(0.0)
            .with_max_tokens(400)
            .with_system("You are a document analyst.");

        let chat_request = client.to_chat_request(&request);
        assert_eq!(chat_request.model, "llama3-70b-8192");
        assert_eq!(chat_request.messages.len(), 2);
        assert_eq!(chat_request.messages[0].role, "system");
        assert_eq!(chat_request.messages[1].role, "user");
        assert_eq!(chat_request.messages[1].content, "Hello");
        assert_eq!(chat_request.temperature, Some(0.0));
        assert_eq!(chat_request.max_tokens, Some(400));
    }

    #[test]
    fn test_chat_request_without_system() {
        let client = OpenAiCompatClient::groq("test-key").unwrap();
        let request = LlmRequest::new("Hello", "llama3-70b-8192");

        let chat_request = client.to_chat_request(&request);
        assert_eq!(chat_request.messages.len(), 1);
        assert_eq!(chat_request.messages[0].role, "user");
    }
}
