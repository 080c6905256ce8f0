//! Retrieval engine orchestration.
//!
//! Ties the pipeline together: raw text is chunked off the async path,
//! embedded through the cache, indexed once per document, and then each
//! question retrieves its adaptive top-k subset. A batch helper answers
//! many questions concurrently against one prepared document through the
//! answer-generation collaborator.

use crate::chunker::chunk_text;
use crate::embeddings::{DocumentEmbedder, EmbeddingCache, EmbeddingProvider};
use crate::index::{document_cache_key, IndexCache, VectorIndex};
use crate::retriever::{adaptive_k, fallback_chunks, select_chunks};
use docquery_core::{AppError, AppResult, ChunkingConfig};
use docquery_llm::{answer_question, Answer, LlmClient};
use futures::future::join_all;
use std::sync::Arc;

/// A document ready for retrieval: its chunk sequence and vector index.
///
/// Chunk `i` corresponds to row `i` of the embedding matrix and id `i`
/// in the index, end to end.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// Source identifier supplied by ingestion (filename or URL)
    pub source_key: String,

    /// Cache key tying this document to its content
    pub cache_key: String,

    /// Raw text length, drives the adaptive-k policy
    pub text_len: usize,

    /// Ordered chunk sequence
    pub chunks: Arc<Vec<String>>,

    /// Vector index over the chunk embeddings (possibly the empty sentinel)
    pub index: VectorIndex,
}

/// The retrieval engine: chunking, embedding, indexing, and selection.
///
/// Caches are injected so callers control sharing and lifetime; cloning
/// the engine shares them. Concurrent questions against one prepared
/// document only read shared state.
#[derive(Debug, Clone)]
pub struct RetrievalEngine {
    embedder: DocumentEmbedder,
    index_cache: IndexCache,
    chunking: ChunkingConfig,
}

impl RetrievalEngine {
    /// Create an engine with explicit caches and chunking calibration.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        embedding_cache: EmbeddingCache,
        index_cache: IndexCache,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embedder: DocumentEmbedder::new(provider, embedding_cache),
            index_cache,
            chunking,
        }
    }

    /// Create an engine with fresh caches and default chunking.
    pub fn with_defaults(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(
            provider,
            EmbeddingCache::new(),
            IndexCache::new(),
            ChunkingConfig::default(),
        )
    }

    /// Access the embedding cache (hit/miss accounting).
    pub fn embedding_cache(&self) -> &EmbeddingCache {
        self.embedder.cache()
    }

    /// Access the index cache.
    pub fn index_cache(&self) -> &IndexCache {
        &self.index_cache
    }

    /// Prepare a document for retrieval.
    ///
    /// Chunking is CPU-bound and runs on the blocking pool so it cannot
    /// stall concurrent question handling. The index is reused from the
    /// cache when this source and content were seen before; otherwise
    /// the chunks are embedded (through the embedding cache) and a new
    /// index is built and cached. An embedding backend failure degrades
    /// to the empty-sentinel index instead of failing the request, and
    /// leaves the cache untouched so a later request may retry.
    pub async fn prepare(&self, raw_text: &str, source_key: &str) -> AppResult<PreparedDocument> {
        let text_len = raw_text.len();
        let cache_key = document_cache_key(source_key, raw_text);

        let text = raw_text.to_string();
        let chunking = self.chunking.clone();
        let chunks = tokio::task::spawn_blocking(move || chunk_text(&text, &chunking))
            .await
            .map_err(|e| AppError::Other(format!("Chunking task failed: {}", e)))?;
        let chunks = Arc::new(chunks);

        tracing::info!(
            source = source_key,
            text_kb = text_len / 1024,
            chunks = chunks.len(),
            "Prepared document chunks"
        );

        let index = if let Some(index) = self.index_cache.get(&cache_key) {
            tracing::debug!(key = %cache_key, "Index cache hit");
            index
        } else {
            match self.embedder.embed_document(&chunks).await {
                Ok(matrix) => {
                    let index = VectorIndex::build(matrix)?;
                    self.index_cache.insert(cache_key.clone(), index.clone());
                    index
                }
                Err(e) => {
                    tracing::warn!(
                        source = source_key,
                        "Embedding backend failed, retrieval will fall back to document order: {}",
                        e
                    );
                    VectorIndex::empty()
                }
            }
        };

        Ok(PreparedDocument {
            source_key: source_key.to_string(),
            cache_key,
            text_len,
            chunks,
            index,
        })
    }

    /// Retrieve the top-k chunks for one question.
    ///
    /// k adapts to document size. When the index is unusable, the query
    /// embedding fails, or search yields nothing, the first k chunks in
    /// original order are returned instead; a non-empty document never
    /// produces an empty result.
    pub async fn retrieve(&self, question: &str, document: &PreparedDocument) -> Vec<String> {
        let k = adaptive_k(document.text_len);

        if document.chunks.is_empty() {
            return Vec::new();
        }

        if document.index.is_empty() {
            tracing::debug!("No usable index, serving original-order fallback");
            return fallback_chunks(&document.chunks, k);
        }

        let query = match self.embedder.embed_query(question).await {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!("Query embedding failed, serving original-order fallback: {}", e);
                return fallback_chunks(&document.chunks, k);
            }
        };

        let hits = document.index.search(&query, k);
        let selected = select_chunks(&document.chunks, &hits);

        if selected.is_empty() {
            tracing::debug!("Search produced no usable hits, serving original-order fallback");
            return fallback_chunks(&document.chunks, k);
        }

        selected
    }

    /// Answer a batch of questions about one document.
    ///
    /// The document is prepared once; questions then run concurrently,
    /// each retrieving independently against the shared read-only index.
    /// Answers come back in question order.
    pub async fn answer_all(
        &self,
        client: &dyn LlmClient,
        model: &str,
        raw_text: &str,
        source_key: &str,
        questions: &[String],
    ) -> AppResult<Vec<Answer>> {
        let document = self.prepare(raw_text, source_key).await?;

        let tasks = questions.iter().map(|question| {
            let document = &document;
            async move {
                let chunks = self.retrieve(question, document).await;
                answer_question(client, model, question, &chunks).await
            }
        });

        Ok(join_all(tasks).await)
    }
}
