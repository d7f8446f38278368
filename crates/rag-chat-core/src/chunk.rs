//! Fixed-size overlapping window chunker.
//!
//! Splits document text into windows of `window` characters, each starting
//! `window - overlap` characters after the previous one, so consecutive
//! windows share exactly `overlap` characters. The last window may be
//! shorter. Windows are measured in Unicode scalar values, never bytes, so
//! a window boundary cannot fall inside a UTF-8 sequence.
//!
//! # Algorithm
//!
//! 1. Emit `text[start..start + window]` (clamped to the text length).
//! 2. Stop once a window reaches the end of the text.
//! 3. Otherwise advance `start` by `window - overlap` and repeat.
//!
//! A text of `L` characters therefore yields `ceil((L - overlap) / step)`
//! windows (at least one when the text is non-empty, none when it is empty).
//!
//! [`chunk_document`] then trims each window and drops the ones that are
//! empty after trimming. Dropped windows still consume their sequence index.
//!
//! # Example
//!
//! ```rust
//! use rag_chat_core::chunk::{chunk_windows, ChunkParams};
//!
//! let params = ChunkParams::new(4, 1).unwrap();
//! assert_eq!(chunk_windows("abcdefg", &params), vec!["abcd", "defg"]);
//! ```

use anyhow::{bail, Result};

use crate::models::{Chunk, Document};

/// Characters kept in [`Chunk::preview`] unless configured otherwise.
pub const DEFAULT_PREVIEW_CHARS: usize = 200;

/// Validated window geometry.
///
/// Construction rejects `window == 0` and `overlap >= window`; both would
/// make the window start stop advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    window: usize,
    overlap: usize,
    preview: usize,
}

impl ChunkParams {
    pub fn new(window: usize, overlap: usize) -> Result<Self> {
        if window == 0 {
            bail!("chunk window size must be > 0");
        }
        if overlap >= window {
            bail!(
                "chunk overlap ({}) must be smaller than the window size ({})",
                overlap,
                window
            );
        }
        Ok(Self {
            window,
            overlap,
            preview: DEFAULT_PREVIEW_CHARS,
        })
    }

    pub fn with_preview(mut self, preview: usize) -> Self {
        self.preview = preview;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between the starts of consecutive windows. Always > 0.
    pub fn step(&self) -> usize {
        self.window - self.overlap
    }
}

/// Split `text` into raw, untrimmed windows.
pub fn chunk_windows<'a>(text: &'a str, params: &ChunkParams) -> Vec<&'a str> {
    // Byte offset of every char, plus the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    let mut windows = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + params.window).min(len);
        windows.push(&text[bounds[start]..bounds[end]]);
        if end == len {
            break;
        }
        start += params.step();
    }
    windows
}

/// Chunk a document into trimmed, non-empty [`Chunk`]s in window order.
pub fn chunk_document(doc: &Document, params: &ChunkParams) -> Vec<Chunk> {
    let source_name = doc.name().to_string();

    let chunks: Vec<Chunk> = chunk_windows(&doc.text, params)
        .into_iter()
        .enumerate()
        .filter_map(|(i, window)| {
            let text = window.trim();
            if text.is_empty() {
                return None;
            }
            Some(Chunk {
                text: text.to_string(),
                source_path: doc.path.clone(),
                source_name: source_name.clone(),
                sequence_index: i,
                preview: text.chars().take(params.preview).collect(),
            })
        })
        .collect();

    tracing::debug!(
        path = %doc.path,
        chars = doc.text.chars().count(),
        chunks = chunks.len(),
        "chunked document"
    );
    chunks
}
