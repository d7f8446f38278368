//! Grounding prompt assembly.
//!
//! [`build_prompt`] renders retrieved chunks and recent conversation turns
//! into the single prompt string sent to the generative model. It is pure
//! and deterministic.
//!
//! # Layout
//!
//! ```text
//! <preamble>
//!
//! CONTEXT:
//! [notes.md]
//! chunk text
//!
//! ---
//!
//! [other.md]
//! chunk text
//!
//! HISTORY:
//! User: earlier question
//! Assistant: earlier answer
//!
//! USER QUESTION:
//! the query
//!
//! <citation instruction>
//! ```
//!
//! Empty context or history sections are kept with an empty body.

use serde::{Deserialize, Serialize};

use crate::history::{ConversationStore, DEFAULT_HISTORY_TURNS};
use crate::models::{ConversationTurn, RetrievalResult};

const PREAMBLE: &str =
    "You are an assistant that answers using the information from the context below whenever relevant";

const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// How chunk sources are labelled in the prompt.
///
/// Only affects citation verbosity, never which chunks are retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationMode {
    /// Headers carry the file name only; the model answers without
    /// citation markup.
    #[default]
    Concise,
    /// Headers carry the full source path and chunk index; the model is
    /// asked to cite sources in brackets.
    Annotated,
}

impl CitationMode {
    fn header(&self, result: &RetrievalResult) -> String {
        match self {
            Self::Annotated => format!(
                "[Source: {} | chunk:{}]",
                result.chunk.source_path, result.chunk.sequence_index
            ),
            Self::Concise => format!("[{}]", result.chunk.source_name),
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Self::Annotated => {
                "Answer concisely and cite the sources in brackets when using the context above"
            }
            Self::Concise => "Answer concisely and naturally based on the context provided",
        }
    }
}

/// Render retrieved chunks as the `CONTEXT:` body.
pub fn render_context(retrieved: &[RetrievalResult], mode: CitationMode) -> String {
    retrieved
        .iter()
        .map(|r| format!("{}\n{}", mode.header(r), r.chunk.text))
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

/// Render turns as the `HISTORY:` body, oldest first.
pub fn render_history(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|t| format!("User: {}\nAssistant: {}", t.question, t.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assemble the full prompt.
///
/// `history` is rendered as given; callers bound it (see
/// [`PromptAssembler`]).
pub fn build_prompt(
    query: &str,
    retrieved: &[RetrievalResult],
    history: &[ConversationTurn],
    mode: CitationMode,
) -> String {
    format!(
        "{PREAMBLE}\n\nCONTEXT:\n{}\n\nHISTORY:\n{}\n\nUSER QUESTION:\n{}\n\n{}\n",
        render_context(retrieved, mode),
        render_history(history),
        query,
        mode.instruction()
    )
}

/// [`build_prompt`] with a history bound and citation mode fixed at
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct PromptAssembler {
    pub history_turns: usize,
    pub mode: CitationMode,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self {
            history_turns: DEFAULT_HISTORY_TURNS,
            mode: CitationMode::default(),
        }
    }
}

impl PromptAssembler {
    pub fn new(history_turns: usize, mode: CitationMode) -> Self {
        Self {
            history_turns,
            mode,
        }
    }

    pub fn build(
        &self,
        query: &str,
        retrieved: &[RetrievalResult],
        history: &ConversationStore,
    ) -> String {
        let turns = history.recent(self.history_turns);
        let prompt = build_prompt(query, retrieved, turns, self.mode);
        tracing::debug!(
            context_chunks = retrieved.len(),
            history_turns = turns.len(),
            chars = prompt.len(),
            "built prompt"
        );
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn result(path: &str, name: &str, index: usize, text: &str) -> RetrievalResult {
        RetrievalResult {
            chunk: Chunk {
                text: text.to_string(),
                source_path: path.to_string(),
                source_name: name.to_string(),
                sequence_index: index,
                preview: text.to_string(),
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_empty_inputs() {
        let prompt = build_prompt("What is X?", &[], &[], CitationMode::Concise);
        assert!(prompt.contains("CONTEXT:\n\n\nHISTORY:"));
        assert!(prompt.contains("HISTORY:\n\n\nUSER QUESTION:"));
        assert!(prompt.contains("USER QUESTION:\nWhat is X?\n\n"));
    }

    #[test]
    fn test_exact_layout() {
        let retrieved = vec![result("docs/a.md", "a.md", 0, "alpha text")];
        let history = vec![ConversationTurn {
            question: "hi".to_string(),
            answer: "hello".to_string(),
        }];
        let prompt = build_prompt("why?", &retrieved, &history, CitationMode::Concise);
        assert_eq!(
            prompt,
            "You are an assistant that answers using the information from the context below whenever relevant\n\n\
             CONTEXT:\n[a.md]\nalpha text\n\n\
             HISTORY:\nUser: hi\nAssistant: hello\n\n\
             USER QUESTION:\nwhy?\n\n\
             Answer concisely and naturally based on the context provided\n"
        );
    }

    #[test]
    fn test_annotated_headers_and_instruction() {
        let retrieved = vec![
            result("docs/guide/a.md", "a.md", 3, "first"),
            result("docs/b.md", "b.md", 0, "second"),
        ];
        let prompt = build_prompt("q", &retrieved, &[], CitationMode::Annotated);
        assert!(prompt.contains(
            "[Source: docs/guide/a.md | chunk:3]\nfirst\n\n---\n\n[Source: docs/b.md | chunk:0]\nsecond"
        ));
        assert!(prompt.ends_with("cite the sources in brackets when using the context above\n"));
    }

    #[test]
    fn test_concise_headers_use_basename() {
        let retrieved = vec![result("docs/guide/a.md", "a.md", 3, "first")];
        let prompt = build_prompt("q", &retrieved, &[], CitationMode::Concise);
        assert!(prompt.contains("[a.md]\nfirst"));
        assert!(!prompt.contains("docs/guide"));
        assert!(!prompt.contains("chunk:"));
    }

    #[test]
    fn test_context_preserves_retrieval_order() {
        let retrieved = vec![
            result("z.md", "z.md", 0, "zzz"),
            result("a.md", "a.md", 0, "aaa"),
        ];
        let ctx = render_context(&retrieved, CitationMode::Concise);
        assert!(ctx.find("zzz").unwrap() < ctx.find("aaa").unwrap());
    }

    #[test]
    fn test_history_bounded_to_last_six() {
        let mut store = ConversationStore::new();
        for i in 0..10 {
            store.append(format!("question {}", i), format!("answer {}", i));
        }
        let prompt = PromptAssembler::default().build("now", &[], &store);

        for i in 0..4 {
            assert!(!prompt.contains(&format!("question {}\n", i)));
        }
        let first = prompt.find("User: question 4\n").unwrap();
        let last = prompt.find("User: question 9\n").unwrap();
        assert!(first < last);
        assert_eq!(prompt.matches("User: ").count(), 6);
    }

    #[test]
    fn test_custom_history_bound() {
        let mut store = ConversationStore::new();
        for i in 0..5 {
            store.append(format!("q{}", i), format!("a{}", i));
        }
        let prompt = PromptAssembler::new(2, CitationMode::Concise).build("x", &[], &store);
        assert_eq!(prompt.matches("User: ").count(), 2);
        assert!(prompt.contains("User: q3\nAssistant: a3\nUser: q4\nAssistant: a4"));
    }

    #[test]
    fn test_mode_does_not_change_chunks() {
        let retrieved = vec![result("d/a.md", "a.md", 1, "body one")];
        for mode in [CitationMode::Concise, CitationMode::Annotated] {
            assert!(build_prompt("q", &retrieved, &[], mode).contains("body one"));
        }
    }
}
