//! Embedding generation with content-addressed caching.
//!
//! Wraps a pluggable [`EmbeddingProvider`] behind a cache keyed by a
//! signature of the chunk batch, so identical chunk sets are never
//! re-embedded within a process lifetime.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use docquery_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Number of leading chunks folded into a batch signature.
///
/// A bounded prefix keeps signature computation cheap on large documents
/// while still separating batches that differ early. Collisions across
/// different tails of otherwise-identical prefixes are guarded by the
/// total count and length also baked into the key.
const SIGNATURE_PREFIX_CHUNKS: usize = 5;

/// The embedding matrix for one chunk batch, row i belonging to chunk i.
pub type EmbeddingMatrix = Arc<Vec<Vec<f32>>>;

/// Process-wide cache of embedding matrices, keyed by batch signature.
///
/// Explicitly constructed and injected rather than held as ambient
/// state, so tests get a fresh cache per case. Append-only: entries are
/// never evicted within a process lifetime, and concurrent writers
/// computing the same key overwrite idempotently.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingCache {
    entries: Arc<RwLock<HashMap<String, EmbeddingMatrix>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl EmbeddingCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a matrix by signature, counting the hit or miss.
    pub fn get(&self, signature: &str) -> Option<EmbeddingMatrix> {
        let entries = self.entries.read().expect("embedding cache poisoned");
        match entries.get(signature) {
            Some(matrix) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(matrix))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a matrix under its signature.
    pub fn insert(&self, signature: String, matrix: EmbeddingMatrix) {
        let mut entries = self.entries.write().expect("embedding cache poisoned");
        entries.insert(signature, matrix);
    }

    /// Number of cache hits observed so far.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of cache misses observed so far.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of stored matrices.
    pub fn len(&self) -> usize {
        self.entries.read().expect("embedding cache poisoned").len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compute the cache signature for a chunk batch.
///
/// The signature folds in the model identity (mixing models would
/// silently corrupt distance comparisons), the batch shape, and a
/// length-plus-digest pair for each chunk in a bounded prefix.
pub fn batch_signature(model: &str, chunks: &[String]) -> String {
    let total_len: usize = chunks.iter().map(|c| c.len()).sum();

    let mut signature = format!("{}:{}:{}", model, chunks.len(), total_len);
    for chunk in chunks.iter().take(SIGNATURE_PREFIX_CHUNKS) {
        let digest = Sha256::digest(chunk.as_bytes());
        signature.push_str(&format!(":{}:{:x}", chunk.len(), digest));
    }

    signature
}

/// Embeds chunk batches and queries through a provider, with caching.
///
/// The critical retrieval path never sees a raw transport error from
/// here: failures surface as typed `AppError::Embedding` values the
/// engine maps onto its degraded fallback.
#[derive(Debug, Clone)]
pub struct DocumentEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    cache: EmbeddingCache,
}

impl DocumentEmbedder {
    /// Create an embedder over a provider with an injected cache.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, cache: EmbeddingCache) -> Self {
        Self { provider, cache }
    }

    /// The provider's declared dimensionality.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Access the underlying cache (hit/miss accounting).
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Embed a chunk batch, consulting the cache first.
    ///
    /// On a hit the stored matrix is returned as-is (bit-for-bit the
    /// matrix from the first computation). On a miss the provider is
    /// called once, the result validated against the declared
    /// dimensionality, stored, and returned.
    pub async fn embed_document(&self, chunks: &[String]) -> AppResult<EmbeddingMatrix> {
        if chunks.is_empty() {
            return Ok(Arc::new(Vec::new()));
        }

        let signature = batch_signature(self.provider.model_name(), chunks);
        if let Some(matrix) = self.cache.get(&signature) {
            tracing::debug!(
                chunks = chunks.len(),
                "Embedding cache hit, skipping backend"
            );
            return Ok(matrix);
        }

        tracing::debug!(
            chunks = chunks.len(),
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            "Embedding cache miss, calling backend"
        );

        let rows = self.provider.embed_documents(chunks).await?;
        self.validate_matrix(chunks.len(), &rows)?;

        let matrix: EmbeddingMatrix = Arc::new(rows);
        self.cache.insert(signature, Arc::clone(&matrix));

        Ok(matrix)
    }

    /// Embed a single query in the provider's query mode.
    pub async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        let embedding = self.provider.embed_query(text).await?;
        if embedding.len() != self.provider.dimensions() {
            return Err(AppError::Embedding(format!(
                "Query embedding has {} dimensions, expected {}",
                embedding.len(),
                self.provider.dimensions()
            )));
        }
        Ok(embedding)
    }

    /// Chunk/row alignment and dimensionality checks.
    fn validate_matrix(&self, expected_rows: usize, rows: &[Vec<f32>]) -> AppResult<()> {
        if rows.len() != expected_rows {
            // Row i must always belong to chunk i
            debug_assert_eq!(rows.len(), expected_rows, "chunk/embedding misalignment");
            return Err(AppError::Embedding(format!(
                "Backend returned {} rows for {} chunks",
                rows.len(),
                expected_rows
            )));
        }

        let dimensions = self.provider.dimensions();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dimensions {
                return Err(AppError::Embedding(format!(
                    "Row {} has {} dimensions, expected {}",
                    i,
                    row.len(),
                    dimensions
                )));
            }
        }

        Ok(())
    }
}
