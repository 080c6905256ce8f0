//! In-memory vector index over chunk embeddings.
//!
//! Exact cosine-similarity search over the embedding matrix of one
//! document, plus a process-wide cache of built indexes keyed by source
//! and content fingerprint. Exact scan is the chosen speed/recall knob
//! at the chunk counts this engine sees; it never fabricates ids and
//! degrades to nothing worse than a linear pass.

use crate::embeddings::EmbeddingMatrix;
use docquery_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Nearest-neighbor index over one document's chunk vectors.
///
/// Row id `i` always corresponds to chunk `i` of the document the matrix
/// was built from. An index with zero rows is the "no index" sentinel:
/// searching it is a no-op and callers fall back to original-order
/// selection.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    vectors: EmbeddingMatrix,
    dimensions: usize,
}

impl VectorIndex {
    /// Build an index from an embedding matrix.
    ///
    /// Zero rows produce the empty sentinel. Rows of inconsistent
    /// dimensionality are rejected: they would silently corrupt distance
    /// comparisons.
    pub fn build(vectors: EmbeddingMatrix) -> AppResult<Self> {
        let dimensions = match vectors.first() {
            Some(row) => row.len(),
            None => return Ok(Self::empty()),
        };

        if dimensions == 0 {
            return Err(AppError::Index(
                "Cannot index zero-dimensional vectors".to_string(),
            ));
        }

        for (i, row) in vectors.iter().enumerate() {
            if row.len() != dimensions {
                return Err(AppError::Index(format!(
                    "Row {} has {} dimensions, expected {}",
                    i,
                    row.len(),
                    dimensions
                )));
            }
        }

        tracing::debug!(rows = vectors.len(), dimensions, "Built vector index");

        Ok(Self {
            vectors,
            dimensions,
        })
    }

    /// The "no index" sentinel.
    pub fn empty() -> Self {
        Self {
            vectors: Arc::new(Vec::new()),
            dimensions: 0,
        }
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether this is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Search for the top-k rows by descending cosine similarity.
    ///
    /// Returns `(row_id, score)` pairs, closest first. `k` greater than
    /// the row count returns every row. A query of the wrong
    /// dimensionality is a programming error upstream; it trips an
    /// assertion in debug builds and returns no hits in release.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }

        if query.len() != self.dimensions {
            debug_assert_eq!(
                query.len(),
                self.dimensions,
                "query/index dimensionality mismatch"
            );
            tracing::error!(
                query = query.len(),
                index = self.dimensions,
                "Query dimensionality does not match index"
            );
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, row)| (id, cosine_similarity(query, row)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k.min(self.vectors.len()));

        scored
    }
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cache key for one document: source key plus content fingerprint.
///
/// Keying on the source alone would hand back a stale index when a new
/// document reuses an old filename; the fingerprint ties the entry to
/// the actual text.
pub fn document_cache_key(source_key: &str, raw_text: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(raw_text.as_bytes()));
    format!("{}:{}", source_key, &digest[..16])
}

/// Process-wide cache of built indexes, keyed by [`document_cache_key`].
///
/// Injected into the engine like the embedding cache. Append-only with
/// idempotent overwrite; entries live for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct IndexCache {
    entries: Arc<RwLock<HashMap<String, VectorIndex>>>,
}

impl IndexCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a built index.
    pub fn get(&self, key: &str) -> Option<VectorIndex> {
        let entries = self.entries.read().expect("index cache poisoned");
        entries.get(key).cloned()
    }

    /// Store a built index.
    pub fn insert(&self, key: String, index: VectorIndex) {
        let mut entries = self.entries.write().expect("index cache poisoned");
        entries.insert(key, index);
    }

    /// Number of cached indexes.
    pub fn len(&self) -> usize {
        self.entries.read().expect("index cache poisoned").len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f32>>) -> EmbeddingMatrix {
        Arc::new(rows)
    }

    #[test]
    fn test_build_empty_is_sentinel() {
        let index = VectorIndex::build(matrix(vec![])).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0], 3).is_empty());
    }

    #[test]
    fn test_build_rejects_ragged_rows() {
        let result = VectorIndex::build(matrix(vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]]));
        assert!(result.is_err());
    }

    #[test]
    fn test_search_returns_k_distinct_ids_in_range() {
        let index = VectorIndex::build(matrix(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.7, 0.7, 0.0],
        ]))
        .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 3);
        assert_eq!(results.len(), 3);

        let mut ids: Vec<usize> = results.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3, "ids must be distinct");
        assert!(ids.iter().all(|&id| id < 4));
    }

    #[test]
    fn test_search_orders_by_descending_similarity() {
        let index = VectorIndex::build(matrix(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.9, 0.1],
        ]))
        .unwrap();

        let results = index.search(&[1.0, 0.0], 3);
        assert_eq!(results[0].0, 1, "exact match first");
        assert_eq!(results[1].0, 2);
        assert_eq!(results[2].0, 0);
        assert!(results[0].1 >= results[1].1 && results[1].1 >= results[2].1);
    }

    #[test]
    fn test_k_beyond_row_count_returns_all() {
        let index =
            VectorIndex::build(matrix(vec![vec![1.0, 0.0], vec![0.0, 1.0]])).unwrap();

        let results = index.search(&[1.0, 0.0], 10);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_zero_k_returns_nothing() {
        let index = VectorIndex::build(matrix(vec![vec![1.0, 0.0]])).unwrap();
        assert!(index.search(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 0.001);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_document_cache_key_tracks_content() {
        let a = document_cache_key("policy.pdf", "first upload");
        let b = document_cache_key("policy.pdf", "second upload");
        let c = document_cache_key("policy.pdf", "first upload");

        assert_ne!(a, b, "same filename, different content");
        assert_eq!(a, c, "same filename and content");
        assert!(a.starts_with("policy.pdf:"));
    }

    #[test]
    fn test_index_cache_roundtrip() {
        let cache = IndexCache::new();
        let key = document_cache_key("doc.pdf", "content");

        assert!(cache.get(&key).is_none());

        let index = VectorIndex::build(matrix(vec![vec![1.0, 0.0]])).unwrap();
        cache.insert(key.clone(), index);

        let cached = cache.get(&key).expect("index should be cached");
        assert_eq!(cached.len(), 1);
        assert_eq!(cache.len(), 1);
    }
}
