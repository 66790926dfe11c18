//! # Word-Window Chunking Module
//!
//! Splits page text into fixed-size word windows with overlap. Chunks are the
//! atomic retrieval unit: each one is embedded and stored on its own.
//!
//! ## Chunking Strategy
//!
//! 1. Text with at most `chunk_size_words` words is returned unchanged as one chunk
//! 2. Longer text is covered by windows of `chunk_size_words` words, each starting
//!    `chunk_size_words - overlap_words` words after the previous one
//! 3. The last window ends at the text boundary and may be shorter
//!
//! Windows are re-joined with single spaces, so chunk text is
//! whitespace-normalized. The function is pure and deterministic.

use crate::processor::ChunkOptions;
use serde::Serialize;
use tracing::{debug, instrument};

/// A chunk of text with its position in the page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextChunk {
    /// The text of the chunk
    pub text: String,

    /// 0-based ordinal of the chunk within the page
    pub position: usize,

    /// Number of words in the chunk
    pub word_count: usize,
}

/// Split `text` into overlapping word windows
#[instrument(skip(text), fields(len = text.len()))]
pub fn chunk_words(text: &str, options: &ChunkOptions) -> Vec<TextChunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let size = options.chunk_size_words();

    if words.len() <= size {
        return vec![TextChunk {
            text: text.to_string(),
            position: 0,
            word_count: words.len(),
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(words.len());
        chunks.push(TextChunk {
            text: words[start..end].join(" "),
            position: chunks.len(),
            word_count: end - start,
        });
        if end >= words.len() {
            break;
        }
        start += options.stride();
    }

    debug!("split {} words into {} chunks", words.len(), chunks.len());
    chunks
}
