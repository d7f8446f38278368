//! Query-time retrieval: embed the query, search the index, join chunks.

use std::sync::Arc;

use anyhow::Result;

use crate::embedding::{embed_one, Embedder};
use crate::index::VectorIndex;
use crate::models::RetrievalResult;

/// Owns the built [`VectorIndex`] and the embedder used for queries.
///
/// The same embedder (and model) that produced the index vectors must be
/// used for queries, otherwise scores are meaningless.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: VectorIndex,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: VectorIndex) -> Self {
        Self { embedder, index }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Return up to `k` chunks most similar to `query`, best first.
    ///
    /// An empty index short-circuits without calling the embedder, so an
    /// empty corpus never touches the embedding service at query time.
    /// Positions without a stored chunk are skipped, which may shrink the
    /// result below `k`.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures for the query, and returns
    /// [`EmbeddingError::DimensionMismatch`](crate::embedding::EmbeddingError)
    /// when the query vector's length differs from the index's.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embed_one(self.embedder.as_ref(), query).await?;
        let hits = self.index.search(&query_vec, k)?;
        tracing::debug!(?hits, "similarity search");

        let results: Vec<RetrievalResult> = hits
            .into_iter()
            .filter_map(|(position, score)| match self.index.entry(position) {
                Some(chunk) => Some(RetrievalResult {
                    chunk: chunk.clone(),
                    score,
                }),
                None => {
                    tracing::debug!(position, "dropping hit without chunk");
                    None
                }
            })
            .collect();

        tracing::debug!(retrieved = results.len(), k, "retrieved chunks");
        Ok(results)
    }
}
