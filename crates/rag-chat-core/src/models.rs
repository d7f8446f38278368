//! Core data models shared by the ingestion and query pipelines.

use serde::Serialize;

/// A source file loaded from the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path of the file as discovered (used verbatim in annotated citations).
    pub path: String,
    /// Full file contents.
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// Final path component, falling back to the whole path.
    pub fn name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .find(|s| !s.is_empty())
            .unwrap_or(&self.path)
    }
}

/// A trimmed window of a document's text, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Window text, never empty or whitespace-only.
    pub text: String,
    /// Full path of the parent document.
    pub source_path: String,
    /// Basename of `source_path`.
    pub source_name: String,
    /// Position of the window within its document. Not globally unique and
    /// may skip values where a whitespace-only window was dropped.
    pub sequence_index: usize,
    /// Bounded prefix of `text` for display.
    pub preview: String,
}

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    /// Inner product of unit vectors, i.e. cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// One question/answer exchange of the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}
