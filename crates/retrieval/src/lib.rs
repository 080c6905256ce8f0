//! Retrieval engine for document question answering.
//!
//! Turns raw extracted text into overlapping semantic chunks, embeds
//! chunks and queries through a pluggable provider with content-addressed
//! caching, indexes the vectors in memory once per document, and selects
//! an adaptively-sized top-k chunk subset per question. The chunk subset
//! feeds the answer-generation collaborator in `docquery-llm`.
//!
//! # Example
//! ```no_run
//! use docquery_retrieval::embeddings::create_provider;
//! use docquery_retrieval::RetrievalEngine;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = create_provider("trigram", "trigram-v1", 384, None)?;
//! let engine = RetrievalEngine::with_defaults(provider);
//!
//! let document = engine
//!     .prepare("The grace period is thirty days. Claims need receipts.", "policy.txt")
//!     .await?;
//! let chunks = engine.retrieve("How long is the grace period?", &document).await;
//! assert!(!chunks.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod embeddings;
pub mod engine;
pub mod index;
pub mod retriever;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::chunk_text;
pub use embeddings::{
    batch_signature, create_provider, DocumentEmbedder, EmbeddingCache, EmbeddingMatrix,
    EmbeddingProvider,
};
pub use engine::{PreparedDocument, RetrievalEngine};
pub use index::{document_cache_key, IndexCache, VectorIndex};
pub use retriever::adaptive_k;
