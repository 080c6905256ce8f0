//! Sentence-aware text chunking with overlap.
//!
//! Splits raw document text into overlapping segments under a size
//! budget. Sentences come from Unicode sentence segmentation, with a
//! rough punctuation fallback for inputs the segmenter cannot break up.
//! Sizes are measured in characters (UTF-8 bytes, boundary-aligned).

use docquery_core::ChunkingConfig;
use unicode_segmentation::UnicodeSegmentation;

/// Upper bound on emitted chunks, scaling with input size.
///
/// Roughly one extra chunk per 2 KiB of input on top of a small base,
/// bounded so a single document can never blow up the index.
fn chunk_cap(text_len: usize) -> usize {
    (text_len / 2048 + 16).min(256)
}

/// Split text into overlapping chunks.
///
/// Sentences are greedily packed into a chunk until the next one would
/// exceed `max_chars`; the closed chunk then seeds its successor with a
/// trailing window of `overlap_chars`, snapped to a word boundary. A
/// sentence longer than `max_chars` is emitted whole rather than split or
/// dropped. When the scaling cap on chunk count is reached, the final
/// chunk absorbs the remainder of the document.
///
/// Chunks shorter than `min_chars` are discarded, unless doing so would
/// leave a non-empty input with no chunks at all.
///
/// Deterministic: identical input and config produce identical output.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let sentences = split_sentences(text, config.max_chars);
    if sentences.is_empty() {
        // Segmentation produced nothing usable; treat the whole input as
        // one chunk rather than aborting.
        return vec![text.trim().to_string()];
    }

    let cap = chunk_cap(text.len());
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut seed_len = 0usize;

    for sentence in sentences {
        let would_overflow =
            !current.is_empty() && current.len() + sentence.len() > config.max_chars;
        let at_cap = chunks.len() + 1 >= cap;

        if would_overflow && current.len() > seed_len && !at_cap {
            let closed = current.trim().to_string();
            let seed = tail_window(&closed, config.overlap_chars);
            if !closed.is_empty() {
                chunks.push(closed);
            }
            seed_len = seed.len();
            current = seed;
        }

        current.push_str(sentence);
    }

    let last = current.trim();
    if !last.is_empty() && current.len() > seed_len {
        chunks.push(last.to_string());
    }

    apply_min_floor(chunks, config.min_chars)
}

/// Discard chunks under the minimum length floor.
///
/// The floor exists to keep near-empty fragments out of retrieval, not
/// to lose content: when every chunk is under the floor the original set
/// is returned unchanged.
fn apply_min_floor(chunks: Vec<String>, min_chars: usize) -> Vec<String> {
    if min_chars == 0 {
        return chunks;
    }

    let kept: Vec<String> = chunks
        .iter()
        .filter(|c| c.len() >= min_chars)
        .cloned()
        .collect();

    if kept.is_empty() {
        chunks
    } else {
        kept
    }
}

/// Segment text into sentences.
///
/// Unicode sentence boundaries first; when the segmenter cannot break an
/// oversized input, fall back to splitting after sentence punctuation.
fn split_sentences(text: &str, max_chars: usize) -> Vec<&str> {
    let segments: Vec<&str> = text
        .split_sentence_bounds()
        .filter(|s| !s.trim().is_empty())
        .collect();

    if segments.len() <= 1 && text.len() > max_chars {
        return text
            .split_rough()
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect();
    }

    segments
}

/// Punctuation-based sentence splitting fallback.
trait RoughSplit {
    fn split_rough(&self) -> Vec<&str>;
}

impl RoughSplit for str {
    fn split_rough(&self) -> Vec<&str> {
        let mut pieces = Vec::new();
        let mut start = 0usize;
        let mut break_pending = false;

        for (idx, ch) in self.char_indices() {
            if matches!(ch, '.' | '!' | '?' | ';' | '\n') {
                break_pending = true;
                continue;
            }
            if break_pending {
                if ch.is_whitespace() {
                    continue;
                }
                pieces.push(&self[start..idx]);
                start = idx;
                break_pending = false;
            }
        }

        if start < self.len() {
            pieces.push(&self[start..]);
        }

        pieces
    }
}

/// Trailing window of a closed chunk, used to seed its successor.
///
/// The window is `overlap` characters from the end, moved forward onto a
/// word boundary so the seed starts with a whole word. Returns the seed
/// with a trailing space separator, or an empty string when overlap is
/// disabled or the window carries nothing useful.
fn tail_window(s: &str, overlap: usize) -> String {
    if overlap == 0 || s.len() <= overlap {
        return String::new();
    }

    let start = floor_char_boundary(s, s.len() - overlap);
    let window = &s[start..];

    // Snap forward past the first whitespace so the seed starts on a
    // whole word; a window without whitespace is used as-is.
    let seed = match window.find(char::is_whitespace) {
        Some(pos) => window[pos..].trim_start(),
        None => window,
    };

    if seed.trim().is_empty() {
        String::new()
    } else {
        format!("{} ", seed)
    }
}

/// Largest char boundary at or below `index`.
#[inline]
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}
