//! Exact in-memory similarity index.
//!
//! [`VectorIndex`] is a flat list of `(vector, chunk)` entries searched by
//! brute-force inner product. Vectors and their chunk metadata are stored
//! side by side, so a search position can never point at the wrong chunk.
//!
//! Vectors must be unit-normalized before [`VectorIndex::build`]; the index
//! does not re-normalize. Under that precondition the inner product is the
//! cosine similarity.
//!
//! The index is built once and is read-only afterwards.

use std::cmp::Ordering;

use crate::embedding::{dot, EmbeddingError};
use crate::models::Chunk;

#[derive(Debug)]
struct IndexEntry {
    vector: Vec<f32>,
    chunk: Chunk,
}

/// Flat inner-product index over normalized vectors.
#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dims: usize,
}

impl VectorIndex {
    /// Build an index from `(vector, chunk)` pairs. Positions are assigned
    /// in iteration order starting at 0.
    ///
    /// An empty input is legal and yields an index whose searches are
    /// always empty.
    ///
    /// # Errors
    ///
    /// [`EmbeddingError::DimensionMismatch`] if the vectors do not all share
    /// the length of the first one.
    pub fn build(
        entries: impl IntoIterator<Item = (Vec<f32>, Chunk)>,
    ) -> Result<Self, EmbeddingError> {
        let entries: Vec<IndexEntry> = entries
            .into_iter()
            .map(|(vector, chunk)| IndexEntry { vector, chunk })
            .collect();

        let dims = entries.first().map(|e| e.vector.len()).unwrap_or(0);
        for (position, e) in entries.iter().enumerate() {
            if e.vector.len() != dims {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dims,
                    actual: e.vector.len(),
                    position,
                });
            }
        }

        tracing::debug!(vectors = entries.len(), dims, "built vector index");
        Ok(Self { entries, dims })
    }

    /// Build from parallel sequences, checking that they line up.
    ///
    /// Convenience for pipelines that embed a chunk list in one call.
    pub fn from_parts(vectors: Vec<Vec<f32>>, chunks: Vec<Chunk>) -> anyhow::Result<Self> {
        if vectors.len() != chunks.len() {
            anyhow::bail!(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }
        Ok(Self::build(vectors.into_iter().zip(chunks))?)
    }

    /// An index with no entries.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            dims: 0,
        }
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality of the stored vectors (`0` when empty).
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Chunk stored at `position`, if any.
    pub fn entry(&self, position: usize) -> Option<&Chunk> {
        self.entries.get(position).map(|e| &e.chunk)
    }

    /// Iterate over stored chunks in position order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Return up to `k` `(position, score)` pairs ordered by descending
    /// inner product with `query`.
    ///
    /// Exact: every stored vector is scored. Ties keep insertion order.
    /// Fewer than `k` entries are returned when the index is smaller than
    /// `k`; `k == 0` and an empty index return nothing.
    ///
    /// # Errors
    ///
    /// [`EmbeddingError::DimensionMismatch`] if `query` does not have the
    /// index dimensionality.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, EmbeddingError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
                position: 0,
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, e)| (position, dot(query, &e.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::empty()
    }
}
