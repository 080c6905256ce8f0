//! LLM integration crate for the docquery engine.
//!
//! This crate provides the answer-generation collaborator: a
//! provider-agnostic abstraction for chat-completion LLMs plus the
//! synthesis step that turns a question and its retrieved chunks into an
//! answer with reasoning, citations, and a confidence label.
//!
//! # Providers
//! - **Groq**: hosted OpenAI-compatible endpoint (default)
//! - **OpenAI**: or any other OpenAI-compatible endpoint
//!
//! # Example
//! ```no_run
//! use docquery_llm::{answer_question, create_client};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_client("groq", None, Some("api-key"))?;
//! let chunks = vec!["The grace period is thirty days.".to_string()];
//! let answer = answer_question(
//!     client.as_ref(),
//!     "llama3-70b-8192",
//!     "What is the grace period?",
//!     &chunks,
//! )
//! .await;
//! println!("{} ({})", answer.answer, answer.confidence.as_str());
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use answer::{answer_question, extract_direct_answer, Answer, Confidence};
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OpenAiCompatClient;
