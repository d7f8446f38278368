//! One chat conversation: retrieve, assemble, generate, remember.

use anyhow::{Context, Result};
use rag_chat_core::{ConversationStore, PromptAssembler, RetrievalResult, Retriever};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::generation::{create_generator, Generator};
use crate::ingest::build_index;
use crate::progress::IndexProgressReporter;

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub retrieved: Vec<RetrievalResult>,
}

/// Holds everything a conversation needs between turns.
///
/// History only grows when a turn completes: a failed retrieval or
/// generation leaves it exactly as it was.
pub struct ChatSession {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    history: ConversationStore,
    assembler: PromptAssembler,
    top_k: usize,
    debug: bool,
}

impl ChatSession {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn Generator>,
        assembler: PromptAssembler,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            history: ConversationStore::new(),
            assembler,
            top_k,
            debug: false,
        }
    }

    /// Session configured from `[retrieval]` and `[chat]`.
    pub fn from_config(
        config: &Config,
        retriever: Retriever,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let assembler = PromptAssembler::new(config.chat.history_turns, config.citation_mode());
        let mut session = Self::new(retriever, generator, assembler, config.retrieval.top_k);
        session.debug = config.chat.debug;
        session
    }

    /// Create both providers, build the index and return a ready session.
    ///
    /// Providers are created first so missing credentials fail before any
    /// indexing work starts.
    pub async fn start(config: &Config, progress: &dyn IndexProgressReporter) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        let index = build_index(config, embedder.clone(), progress).await?;
        Ok(Self::from_config(
            config,
            Retriever::new(embedder, index),
            generator,
        ))
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn history(&self) -> &ConversationStore {
        &self.history
    }

    /// Answer `query` and record the exchange.
    pub async fn ask(&mut self, query: &str) -> Result<Answer> {
        tracing::debug!(query, top_k = self.top_k, "processing query");

        let retrieved = self
            .retriever
            .retrieve(query, self.top_k)
            .await
            .context("Failed to retrieve context")?;

        let prompt = self.assembler.build(query, &retrieved, &self.history);
        if self.debug {
            tracing::debug!("full prompt:\n{}", prompt);
        }

        tracing::debug!(model = self.generator.model_name(), "generating answer");
        let text = self
            .generator
            .generate(&prompt)
            .await
            .context("Failed to generate an answer")?;
        tracing::debug!(chars = text.len(), "generated answer");

        self.history.append(query, text.clone());
        tracing::debug!(turns = self.history.len(), "history updated");

        Ok(Answer { text, retrieved })
    }
}

/// Human-readable listing of the chunks behind an answer (debug mode).
pub fn format_snippets(retrieved: &[RetrievalResult]) -> String {
    let mut out = String::from("[Recovered snippets used (DEBUG MODE):]\n");
    for r in retrieved {
        let _ = writeln!(out, "\n- Source: {}", r.chunk.source_path);
        let _ = writeln!(out, "  Chunk ID: {}", r.chunk.sequence_index);
        let _ = writeln!(out, "  Score: {:.4}", r.score);
        let _ = writeln!(out, "  Preview: {}", r.chunk.preview);
        let _ = writeln!(
            out,
            "  Full chunk length: {} chars",
            r.chunk.text.chars().count()
        );
    }
    out
}
