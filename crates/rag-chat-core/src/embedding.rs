//! Embedding gateway contract and vector utilities.
//!
//! Defines the [`Embedder`] trait that every embedding backend implements,
//! plus the pieces of the gateway that do not depend on a backend:
//!
//! - [`normalize`]: scale a vector to unit length
//! - [`embed_in_batches`]: split texts into bounded batches, embed them in
//!   order, validate the response shape, and normalize
//! - [`reassemble_batches`]: restore input order for batches that were
//!   computed out of order (e.g. concurrently)
//! - [`check_dimensions`]: enforce one dimensionality across all vectors
//!
//! Concrete HTTP providers live in the `rag-chat` app crate.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Batch size used when the caller does not configure one.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Trait for embedding backends.
///
/// `embed` must return exactly one vector per input text, in input order.
/// Vectors need not be normalized; the gateway functions in this module
/// normalize them.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-embedding-001"`).
    fn model_name(&self) -> &str;

    /// Embed one batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Violations of the embedding response contract.
///
/// These are unrecoverable for the current operation: a service that drops
/// vectors or changes dimensionality mid-stream cannot be reconciled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("embedding service returned {actual} vectors for {expected} texts")]
    CountMismatch { expected: usize, actual: usize },
    #[error(
        "embedding dimensionality changed: expected {expected} (from the first vector), got {actual} at position {position}"
    )]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        position: usize,
    },
}

/// Scale `v` to unit Euclidean length.
///
/// A zero vector has no direction, so it is returned unchanged rather than
/// divided by zero. This is a defined result, not an error: such a vector
/// scores `0.0` against every query.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out);
    out
}

/// In-place variant of [`normalize`].
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Inner product of two vectors of equal length.
///
/// For unit vectors this equals cosine similarity.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Verify that every vector has the dimensionality of the first one.
///
/// Returns that dimensionality, or `0` for an empty slice.
pub fn check_dimensions(vectors: &[Vec<f32>]) -> Result<usize, EmbeddingError> {
    let Some(first) = vectors.first() else {
        return Ok(0);
    };
    let expected = first.len();
    for (position, v) in vectors.iter().enumerate() {
        if v.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: v.len(),
                position,
            });
        }
    }
    Ok(expected)
}

/// Check that a batch response has one vector per input text.
pub fn check_batch(expected: usize, vectors: &[Vec<f32>]) -> Result<(), EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        });
    }
    Ok(())
}

/// Flatten batches tagged with their original batch number back into
/// input order.
///
/// Tags are batch numbers (`0, 1, 2, …`), not text offsets; the sort is
/// stable so equal tags keep their relative order.
pub fn reassemble_batches(mut tagged: Vec<(usize, Vec<Vec<f32>>)>) -> Vec<Vec<f32>> {
    tagged.sort_by_key(|(tag, _)| *tag);
    tagged.into_iter().flat_map(|(_, batch)| batch).collect()
}

/// Validate dimensionality across the full sequence and normalize each
/// vector in place.
pub fn finalize_vectors(mut vectors: Vec<Vec<f32>>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    check_dimensions(&vectors)?;
    for v in vectors.iter_mut() {
        normalize_in_place(v);
    }
    Ok(vectors)
}

/// Embed `texts` sequentially in batches of at most `batch_size`.
///
/// Output order equals input order regardless of batch boundaries. The
/// returned vectors are unit-normalized (zero vectors excepted).
///
/// # Errors
///
/// - Any backend error is propagated unchanged.
/// - [`EmbeddingError::CountMismatch`] if a batch response is short or long.
/// - [`EmbeddingError::DimensionMismatch`] if vectors disagree in length.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let total_batches = texts.len().div_ceil(batch_size);
    let mut vectors = Vec::with_capacity(texts.len());

    for (i, batch) in texts.chunks(batch_size).enumerate() {
        tracing::debug!(
            batch = i + 1,
            total = total_batches,
            model = embedder.model_name(),
            "processing embedding batch"
        );
        let out = embedder.embed(batch).await?;
        check_batch(batch.len(), &out)?;
        vectors.extend(out);
    }

    Ok(finalize_vectors(vectors)?)
}

/// Embed a single text (one-item batch) and normalize it.
pub async fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    let mut vectors = embed_in_batches(embedder, &[text.to_string()], 1).await?;
    vectors
        .pop()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}
