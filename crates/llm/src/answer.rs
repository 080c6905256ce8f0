//! Answer synthesis from retrieved document chunks.
//!
//! Takes a question and the ranked chunk subset produced by retrieval,
//! builds a bounded prompt, and post-processes the LLM response into an
//! answer with reasoning, cited references, and a confidence label.

use crate::client::{LlmClient, LlmRequest};
use regex::Regex;
use std::sync::OnceLock;

/// Per-chunk slice carried into the prompt, in characters.
const MAX_CHUNK_CHARS: usize = 300;

/// Completion budget for the answer.
const ANSWER_MAX_TOKENS: u32 = 400;

/// Confidence label attached to a generated answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// A generated answer with its supporting metadata.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Answer {
    /// The answer text
    pub answer: String,

    /// Reasoning behind the answer (currently the full response text)
    pub reasoning: String,

    /// Clause/section references cited in the response
    pub cited_references: Vec<String>,

    /// Confidence label
    pub confidence: Confidence,
}

/// Generate an answer for a question from its retrieved chunks.
///
/// LLM failures are absorbed here: the caller always receives an
/// `Answer`, worst case a Low-confidence error report. The retrieval
/// path never fails because answer generation did.
pub async fn answer_question(
    client: &dyn LlmClient,
    model: &str,
    question: &str,
    chunks: &[String],
) -> Answer {
    let context = build_context(chunks);
    let prompt = build_prompt(question, &context);

    let request = LlmRequest::new(prompt, model)
        .with_system("You are a document analyst. Give direct, concise answers.")
        .with_temperature(0.0)
        .with_max_tokens(ANSWER_MAX_TOKENS);

    match client.complete(&request).await {
        Ok(response) => {
            let text = response.content;
            let cited_references = extract_references(&text);
            let confidence = if cited_references.is_empty() {
                Confidence::Medium
            } else {
                Confidence::High
            };

            Answer {
                answer: extract_direct_answer(&text),
                reasoning: text,
                cited_references: if confidence == Confidence::High {
                    cited_references
                } else {
                    vec!["Document passages".to_string()]
                },
                confidence,
            }
        }
        Err(e) => {
            tracing::warn!("Answer generation failed: {}", e);
            Answer {
                answer: format!("Error generating answer: {}", e),
                reasoning: "Error occurred during processing".to_string(),
                cited_references: Vec::new(),
                confidence: Confidence::Low,
            }
        }
    }
}

/// Build the context block from retrieved chunks under an adaptive budget.
///
/// Larger retrieved sets get a larger budget; each chunk contributes at
/// most `MAX_CHUNK_CHARS` characters. Chunks past the budget are dropped,
/// closest-first ordering is preserved.
fn build_context(chunks: &[String]) -> String {
    let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
    let budget = if total > 5000 {
        2500
    } else if total > 2000 {
        2000
    } else {
        1500
    };

    let mut parts: Vec<&str> = Vec::with_capacity(chunks.len());
    let mut used = 0usize;

    for chunk in chunks {
        let slice = truncate_chars(chunk, MAX_CHUNK_CHARS);
        let slice_chars = slice.chars().count();
        if used + slice_chars >= budget {
            break;
        }
        used += slice_chars;
        parts.push(slice);
    }

    parts.join("\n")
}

/// Build the user prompt for the chat request.
fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer this question based on the provided document passages:\n\n\
         Question: {}\n\n\
         Passages:\n{}\n\n\
         Provide a direct, concise answer. If information is not in the \
         passages, state \"Not specified\".",
        question, context
    )
}

/// Extract clause/section references cited in a response.
fn extract_references(text: &str) -> Vec<String> {
    static REFERENCE_RE: OnceLock<Regex> = OnceLock::new();
    let re = REFERENCE_RE
        .get_or_init(|| Regex::new(r"(?i)\b(clause|section)\s+\d+(?:\.\d+)?").expect("valid regex"));

    let mut references: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let reference = m.as_str().to_lowercase();
        if !references.contains(&reference) {
            references.push(reference);
        }
    }
    references
}

/// Extract the "Direct Answer" section from a verbose response.
///
/// Falls back to the full trimmed text when the marker is absent.
pub fn extract_direct_answer(text: &str) -> String {
    static DIRECT_ANSWER_RE: OnceLock<Regex> = OnceLock::new();
    let re = DIRECT_ANSWER_RE.get_or_init(|| {
        Regex::new(r"(?is)\*\*Direct Answer\*\*[:\s]*(.*?)(?:\n\*\*|$)").expect("valid regex")
    });

    if let Some(captures) = re.captures(text) {
        if let Some(answer) = captures.get(1) {
            let answer = answer.as_str().trim();
            if !answer.is_empty() {
                return answer.to_string();
            }
        }
    }

    text.trim().to_string()
}

/// Truncate to a character budget on a UTF-8 boundary.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LlmResponse, LlmUsage};
    use docquery_core::{AppError, AppResult};

    /// Test double returning a canned response or a canned failure.
    struct ScriptedClient {
        response: Option<String>,
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedClient {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            match &self.response {
                Some(content) => Ok(LlmResponse {
                    content: content.clone(),
                    model: request.model.clone(),
                    usage: LlmUsage::default(),
                }),
                None => Err(AppError::Llm("backend offline".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_answer_cites_clauses_with_high_confidence() {
        let client = ScriptedClient {
            response: Some("Covered under Clause 4.2 and Section 7.".to_string()),
        };

        let chunks = vec!["Clause 4.2 covers hospitalization.".to_string()];
        let answer = answer_question(&client, "llama3-70b-8192", "What is covered?", &chunks).await;

        assert_eq!(answer.confidence, Confidence::High);
        assert!(answer.cited_references.contains(&"clause 4.2".to_string()));
        assert!(answer.cited_references.contains(&"section 7".to_string()));
    }

    #[tokio::test]
    async fn test_answer_without_citations_is_medium_confidence() {
        let client = ScriptedClient {
            response: Some("The waiting period is thirty days.".to_string()),
        };

        let chunks = vec!["A waiting period of thirty days applies.".to_string()];
        let answer = answer_question(&client, "llama3-70b-8192", "Waiting period?", &chunks).await;

        assert_eq!(answer.confidence, Confidence::Medium);
        assert_eq!(answer.cited_references, vec!["Document passages"]);
    }

    #[tokio::test]
    async fn test_llm_failure_is_absorbed_as_low_confidence() {
        let client = ScriptedClient { response: None };

        let chunks = vec!["Some context.".to_string()];
        let answer = answer_question(&client, "llama3-70b-8192", "Anything?", &chunks).await;

        assert_eq!(answer.confidence, Confidence::Low);
        assert!(answer.answer.contains("Error generating answer"));
        assert!(answer.cited_references.is_empty());
    }

    #[test]
    fn test_extract_direct_answer_section() {
        let text = "**Direct Answer**: Thirty days.\n**Reasoning**: See clause 3.";
        assert_eq!(extract_direct_answer(text), "Thirty days.");
    }

    #[test]
    fn test_extract_direct_answer_fallback() {
        let text = "  The policy covers maternity after 24 months.  ";
        assert_eq!(
            extract_direct_answer(text),
            "The policy covers maternity after 24 months."
        );
    }

    #[test]
    fn test_context_budget_adapts_to_total_length() {
        // Small retrieved sets use the small budget and keep everything
        let small: Vec<String> = vec!["short chunk".to_string(); 3];
        let context = build_context(&small);
        assert!(context.len() <= 1500);
        assert_eq!(context.lines().count(), 3);

        // Oversized sets are cut off at the large budget
        let big: Vec<String> = vec!["x".repeat(400); 30];
        let context = build_context(&big);
        assert!(context.len() <= 2500 + 30); // separators
        assert!(context.lines().count() < 30);
    }

    #[test]
    fn test_references_are_deduplicated() {
        let refs = extract_references("Clause 5 applies. As stated, clause 5 is explicit.");
        assert_eq!(refs, vec!["clause 5"]);
    }
}
