//! Deterministic trigram embedding provider.
//!
//! Produces content-dependent vectors from character trigrams and word
//! frequencies. Not semantically comparable to a real embedding model,
//! but deterministic, offline, and discriminative enough for tests,
//! development, and degraded air-gapped deployments.

use crate::embeddings::provider::EmbeddingProvider;
use docquery_core::AppResult;
use std::collections::HashMap;

/// Words too common to carry signal.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Offline embedding provider hashing trigrams into a fixed space.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with the given dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Build a normalized embedding for one text.
    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimensions];

        let lower = text.to_lowercase();
        let mut frequencies: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split_whitespace()
            .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        {
            *frequencies.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &frequencies {
            // Spread each word over several dimensions via its trigrams
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let slot = fold_hash(window.iter().collect::<String>().bytes(), 37) as usize
                    % self.dimensions;
                embedding[slot] += (*freq as f32).sqrt();
            }

            // And once more for the whole word
            let slot = fold_hash(word.bytes(), 31) as usize % self.dimensions;
            embedding[slot] += *freq as f32;
        }

        normalize(&mut embedding);
        embedding
    }
}

/// Multiply-and-add byte folding hash.
fn fold_hash(bytes: impl Iterator<Item = u8>, factor: u64) -> u64 {
    bytes.fold(0_u64, |acc, b| {
        acc.wrapping_mul(factor).wrapping_add(b as u64)
    })
}

/// Scale a vector to unit length in place. Zero vectors stay zero.
fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_documents(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_provider_metadata() {
        let provider = TrigramProvider::new(384);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.provider_name(), "trigram");
        assert_eq!(provider.model_name(), "trigram-v1");
    }

    #[tokio::test]
    async fn test_embeddings_are_unit_vectors() {
        let provider = TrigramProvider::new(384);
        let texts = vec![
            "hospitalization coverage limits".to_string(),
            "grace period for premium payment".to_string(),
        ];

        let rows = provider.embed_documents(&texts).await.unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), 384);
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 0.001);
        }
    }

    #[tokio::test]
    async fn test_deterministic() {
        let provider = TrigramProvider::new(384);
        let text = "deterministic embedding check".to_string();

        let first = provider.embed_documents(&[text.clone()]).await.unwrap();
        let second = provider.embed_documents(&[text]).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let provider = TrigramProvider::new(384);
        let rows = provider
            .embed_documents(&[
                "maternity benefits waiting period".to_string(),
                "no claim discount percentage".to_string(),
            ])
            .await
            .unwrap();
        assert_ne!(rows[0], rows[1]);
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = TrigramProvider::new(384);
        let rows = provider.embed_documents(&["".to_string()]).await.unwrap();
        assert!(rows[0].iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_similar_texts_are_closer() {
        let provider = TrigramProvider::new(384);
        let rows = provider
            .embed_documents(&[
                "the policy covers hospitalization expenses".to_string(),
                "hospitalization expenses covered by the policy".to_string(),
                "recipe for vegetable lasagna dinner".to_string(),
            ])
            .await
            .unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        let related = dot(&rows[0], &rows[1]);
        let unrelated = dot(&rows[0], &rows[2]);
        assert!(
            related > unrelated,
            "related {} should beat unrelated {}",
            related,
            unrelated
        );
    }
}
