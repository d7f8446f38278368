//! # rag-chat core
//!
//! Pure retrieval logic for rag-chat: data models, windowed chunking,
//! vector normalization, the flat similarity index, the retriever, and
//! prompt assembly over bounded conversation history.
//!
//! This crate performs no network, filesystem, or runtime-specific work.
//! Embedding backends plug in through the [`embedding::Embedder`] trait,
//! which the application crate implements over HTTP.

pub mod chunk;
pub mod embedding;
pub mod history;
pub mod index;
pub mod models;
pub mod prompt;
pub mod retrieve;

pub use chunk::{chunk_document, chunk_windows, ChunkParams};
pub use embedding::{normalize, Embedder, EmbeddingError};
pub use history::ConversationStore;
pub use index::VectorIndex;
pub use models::{Chunk, ConversationTurn, Document, RetrievalResult};
pub use prompt::{build_prompt, CitationMode, PromptAssembler};
pub use retrieve::Retriever;
