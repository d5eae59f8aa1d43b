//! Word-bounded, sentence-aligned chunking of post content.
//!
//! Content is scanned character by character while counting
//! whitespace-delimited words. Once a chunk reaches the word limit it is cut
//! right after the most recent sentence boundary seen since the previous
//! cut. Text without any boundary in that window (code listings, long URLs)
//! is cut at the current position so the scan always advances.
//!
//! ```rust,ignore
//! use portfolio_core::chunking::WordChunker;
//!
//! let chunks = WordChunker::new(100).chunk(&post.content);
//! for chunk in &chunks {
//!     println!("{}: {}", chunk.sequence, chunk.text);
//! }
//! ```

use crate::defaults;
use crate::models::Chunk;

/// Splits text into chunks of at most `max_words` words (plus any words
/// that trail the last sentence boundary when none was available).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordChunker {
    max_words: usize,
}

impl Default for WordChunker {
    fn default() -> Self {
        Self::new(defaults::MAX_WORDS_PER_CHUNK)
    }
}

impl WordChunker {
    /// A limit of zero behaves like one.
    pub fn new(max_words: usize) -> Self {
        Self {
            max_words: max_words.max(1),
        }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Split `text` into trimmed, non-empty chunks numbered from 1.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let byte_at = |idx: usize| chars.get(idx).map(|(b, _)| *b).unwrap_or(text.len());

        let mut chunks = Vec::new();
        let mut push = |slice: &str| {
            let trimmed = slice.trim();
            if !trimmed.is_empty() {
                chunks.push(Chunk {
                    sequence: chunks.len() as u32 + 1,
                    text: trimmed.to_string(),
                });
            }
        };

        let mut start = 0usize;
        let mut i = 0usize;
        let mut words = 0usize;
        let mut in_word = false;
        // Char index just past the latest boundary in the current window.
        let mut boundary: Option<usize> = None;

        while i < chars.len() {
            let c = chars[i].1;
            if c.is_whitespace() {
                if in_word {
                    words += 1;
                    in_word = false;
                }
            } else {
                in_word = true;
                if c == defaults::SENTENCE_BOUNDARY {
                    boundary = Some(i + 1);
                }
            }

            if words >= self.max_words {
                let cut = boundary.unwrap_or(i + 1);
                push(&text[byte_at(start)..byte_at(cut)]);
                start = cut;
                i = cut;
                words = 0;
                in_word = false;
                boundary = None;
                continue;
            }
            i += 1;
        }

        if start < chars.len() {
            push(&text[byte_at(start)..]);
        }
        chunks
    }
}

/// Chunk `content` with the given word limit.
pub fn chunk_content(content: &str, max_words: usize) -> Vec<Chunk> {
    WordChunker::new(max_words).chunk(content)
}
