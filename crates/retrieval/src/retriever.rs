//! Retrieval policy: adaptive k and ordered fallback selection.
//!
//! The number of chunks handed to answer generation scales with document
//! size, and retrieval always produces some context for a non-empty
//! document, even when the index or the embedding backend is unusable.

/// Document size above which retrieval widens to four chunks.
const LARGE_DOCUMENT_CHARS: usize = 100_000;

/// Document size above which retrieval widens to three chunks.
const MEDIUM_DOCUMENT_CHARS: usize = 50_000;

/// Choose how many chunks to retrieve for a document of the given size.
///
/// Larger documents spread relevant content across more segments, so
/// they retrieve more. Monotonically non-decreasing in document size.
pub fn adaptive_k(document_size: usize) -> usize {
    if document_size > LARGE_DOCUMENT_CHARS {
        4
    } else if document_size > MEDIUM_DOCUMENT_CHARS {
        3
    } else {
        2
    }
}

/// First-k chunks in original document order.
///
/// The degraded path when similarity ranking is unavailable: worse
/// ranking, same contract.
pub fn fallback_chunks(chunks: &[String], k: usize) -> Vec<String> {
    chunks.iter().take(k).cloned().collect()
}

/// Map search hits back to chunk text, preserving result order.
///
/// Ids outside the chunk list would mean the index was built from a
/// different chunk sequence; that is asserted against in debug builds
/// and skipped in release rather than fabricating content.
pub fn select_chunks(chunks: &[String], hits: &[(usize, f32)]) -> Vec<String> {
    let mut selected = Vec::with_capacity(hits.len());

    for &(id, score) in hits {
        debug_assert!(id < chunks.len(), "search returned out-of-range id {}", id);
        match chunks.get(id) {
            Some(chunk) => {
                tracing::trace!(id, score, "Selected chunk");
                selected.push(chunk.clone());
            }
            None => {
                tracing::error!(id, total = chunks.len(), "Search hit out of range, skipped");
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptive_k_calibration() {
        // The calibration points for short and long documents
        assert_eq!(adaptive_k(10_000), 2);
        assert_eq!(adaptive_k(120_000), 4);

        assert_eq!(adaptive_k(0), 2);
        assert_eq!(adaptive_k(50_000), 2);
        assert_eq!(adaptive_k(50_001), 3);
        assert_eq!(adaptive_k(100_000), 3);
        assert_eq!(adaptive_k(100_001), 4);
    }

    #[test]
    fn test_adaptive_k_is_monotone() {
        let sizes = [0, 1_000, 10_000, 49_999, 50_001, 99_999, 100_001, 500_000];
        for pair in sizes.windows(2) {
            assert!(
                adaptive_k(pair[0]) <= adaptive_k(pair[1]),
                "k must not shrink as documents grow ({} vs {})",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_fallback_takes_first_k_in_order() {
        let chunks: Vec<String> = (0..5).map(|i| format!("chunk {}", i)).collect();

        let selected = fallback_chunks(&chunks, 3);
        assert_eq!(selected, vec!["chunk 0", "chunk 1", "chunk 2"]);

        // k beyond the chunk count returns everything
        let all = fallback_chunks(&chunks, 10);
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_select_preserves_hit_order() {
        let chunks: Vec<String> = (0..4).map(|i| format!("chunk {}", i)).collect();
        let hits = vec![(2, 0.9), (0, 0.7), (3, 0.4)];

        let selected = select_chunks(&chunks, &hits);
        assert_eq!(selected, vec!["chunk 2", "chunk 0", "chunk 3"]);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "out-of-range"))]
    fn test_select_rejects_fabricated_ids() {
        let chunks: Vec<String> = (0..2).map(|i| format!("chunk {}", i)).collect();
        let hits = vec![(0, 0.9), (7, 0.5)];

        // Release builds skip the bad id instead of panicking
        let selected = select_chunks(&chunks, &hits);
        assert_eq!(selected, vec!["chunk 0"]);
    }
}
