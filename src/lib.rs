//! # rag-chat
//!
//! Retrieval-augmented chat over a local Markdown corpus.
//!
//! At startup every `.md` file under the corpus root is split into
//! overlapping character windows, embedded, and held in an in-memory exact
//! inner-product index. Each question is embedded with the same model, the
//! closest chunks are pasted into a grounding prompt together with recent
//! conversation turns, and a generative model writes the answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │   Corpus    │──▶│   Chunk +   │──▶│ VectorIndex │
//! │  (*.md)     │   │   Embed     │   │ (in memory) │
//! └─────────────┘   └─────────────┘   └──────┬──────┘
//!                                            │
//!        ┌──────────┐   ┌──────────┐   ┌─────▼─────┐
//!  You ─▶│   REPL   │──▶│ Session  │──▶│ Retriever │
//!        └──────────┘   └────┬─────┘   └───────────┘
//!                            ▼
//!                     Prompt → Generator
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GEMINI_API_KEY=...        # or put it in .env
//! rag-chat --docs ./docs           # build the index and chat
//! rag-chat ask "How do I deploy?"  # one-shot question
//! rag-chat index --dry-run         # count documents and chunks
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | Markdown discovery and loading |
//! | [`embedding`] | Embedding providers and batched corpus embedding |
//! | [`generation`] | Answer generation providers |
//! | [`http`] | Shared JSON-over-HTTP request loop |
//! | [`ingest`] | Index construction |
//! | [`progress`] | Indexing progress on stderr |
//! | [`session`] | One conversation: retrieve, prompt, generate |
//! | [`repl`] | Interactive loop |
//!
//! The pure pipeline pieces (chunker, index, prompt assembly, history)
//! live in the `rag-chat-core` crate.

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod progress;
pub mod repl;
pub mod session;
