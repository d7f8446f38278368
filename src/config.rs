//! Configuration parsing and validation.
//!
//! rag-chat is configured by an optional TOML file. Every field has a
//! default, so running without a file uses the built-in configuration
//! (corpus in `./docs`, Gemini for both embeddings and generation).
//!
//! # Example
//!
//! ```toml
//! [corpus]
//! root = "./docs"
//!
//! [chunking]
//! window_chars = 1200
//! overlap_chars = 200
//!
//! [retrieval]
//! top_k = 2
//!
//! [embedding]
//! provider = "gemini"
//! model = "gemini-embedding-001"
//! batch_size = 64
//!
//! [generation]
//! provider = "gemini"
//! model = "gemini-2.5-flash"
//!
//! [chat]
//! history_turns = 6
//! debug = false
//! ```
//!
//! API keys are never read from the file; they come from the environment
//! (`GEMINI_API_KEY`, `OPENAI_API_KEY`), optionally via a `.env` file.

use anyhow::{bail, Context, Result};
use rag_chat_core::{ChunkParams, CitationMode};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Providers accepted by both `[embedding]` and `[generation]`.
pub const PROVIDERS: &[&str] = &["gemini", "openai", "ollama"];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./docs")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_window_chars")]
    pub window_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window_chars: default_window_chars(),
            overlap_chars: default_overlap_chars(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_window_chars() -> usize {
    1200
}
fn default_overlap_chars() -> usize {
    200
}
fn default_preview_chars() -> usize {
    rag_chat_core::chunk::DEFAULT_PREVIEW_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of batches in flight at once during indexing.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL override (Ollama host, OpenAI-compatible gateway, …).
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            max_retries: 0,
            timeout_secs: default_embedding_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_embedding_model() -> String {
    "gemini-embedding-001".to_string()
}
fn default_batch_size() -> usize {
    rag_chat_core::embedding::DEFAULT_BATCH_SIZE
}
fn default_concurrency() -> usize {
    1
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_generation_model(),
            max_retries: 0,
            timeout_secs: default_generation_timeout_secs(),
            url: None,
        }
    }
}

fn default_generation_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,
    #[serde(default)]
    pub debug: bool,
    /// Citation style; defaults to annotated in debug mode, concise otherwise.
    #[serde(default)]
    pub citations: Option<CitationMode>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_turns: default_history_turns(),
            debug: false,
            citations: None,
        }
    }
}

fn default_history_turns() -> usize {
    rag_chat_core::history::DEFAULT_HISTORY_TURNS
}

impl Config {
    /// Validated chunk geometry.
    pub fn chunk_params(&self) -> Result<ChunkParams> {
        Ok(ChunkParams::new(
            self.chunking.window_chars,
            self.chunking.overlap_chars,
        )?
        .with_preview(self.chunking.preview_chars))
    }

    pub fn citation_mode(&self) -> CitationMode {
        self.chat.citations.unwrap_or(if self.chat.debug {
            CitationMode::Annotated
        } else {
            CitationMode::Concise
        })
    }

    /// Check cross-field constraints. Called by [`load_config`] and again
    /// after command-line overrides are applied.
    pub fn validate(&self) -> Result<()> {
        self.chunk_params()
            .context("Invalid [chunking] configuration")?;

        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be >= 1");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be >= 1");
        }
        if self.embedding.concurrency == 0 {
            bail!("embedding.concurrency must be >= 1");
        }

        for (section, provider) in [
            ("embedding", &self.embedding.provider),
            ("generation", &self.generation.provider),
        ] {
            if !PROVIDERS.contains(&provider.as_str()) {
                bail!(
                    "Unknown {} provider: '{}'. Must be one of: {}",
                    section,
                    provider,
                    PROVIDERS.join(", ")
                );
            }
        }
        if self.embedding.model.trim().is_empty() {
            bail!("embedding.model must not be empty");
        }
        if self.generation.model.trim().is_empty() {
            bail!("generation.model must not be empty");
        }

        Ok(())
    }
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from `path`, or use defaults when `path` is `None`.
///
/// # Errors
///
/// An explicit path that cannot be read or parsed, or any validation
/// failure, is fatal.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            parse_config(&content)
        }
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Read a credential from the environment.
///
/// A missing or empty variable is a configuration error.
pub fn require_secret(var: &str) -> Result<SecretString> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::new(value)),
        _ => bail!("{} not found in environment (or .env)", var),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.corpus.root, PathBuf::from("./docs"));
        assert_eq!(config.corpus.include_globs, vec!["**/*.md"]);
        assert_eq!(config.chunking.window_chars, 1200);
        assert_eq!(config.chunking.overlap_chars, 200);
        assert_eq!(config.retrieval.top_k, 2);
        assert_eq!(config.embedding.provider, "gemini");
        assert_eq!(config.embedding.model, "gemini-embedding-001");
        assert_eq!(config.embedding.batch_size, 64);
        assert_eq!(config.generation.model, "gemini-2.5-flash");
        assert_eq!(config.chat.history_turns, 6);
        assert_eq!(config.citation_mode(), CitationMode::Concise);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.retrieval.top_k, 2);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
[chunking]
window_chars = 60
overlap_chars = 20

[embedding]
provider = "openai"
model = "text-embedding-3-small"
concurrency = 4

[chat]
debug = true
"#,
        )
        .unwrap();
        assert_eq!(config.chunking.window_chars, 60);
        assert_eq!(config.chunking.preview_chars, 200);
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.concurrency, 4);
        assert_eq!(config.embedding.batch_size, 64);
        assert_eq!(config.generation.provider, "gemini");
        assert_eq!(config.citation_mode(), CitationMode::Annotated);
    }

    #[test]
    fn test_explicit_citation_mode_wins() {
        let config = parse_config("[chat]\ndebug = true\ncitations = \"concise\"\n").unwrap();
        assert_eq!(config.citation_mode(), CitationMode::Concise);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_window() {
        let err = parse_config("[chunking]\nwindow_chars = 100\noverlap_chars = 100\n")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("overlap"));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(parse_config("[chunking]\nwindow_chars = 0\noverlap_chars = 0\n").is_err());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        assert!(parse_config("[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(parse_config("[embedding]\nbatch_size = 0\n").is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = parse_config("[generation]\nprovider = \"watson\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown generation provider"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(parse_config("[chunking\nwindow_chars = ").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/rag.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_require_secret_missing() {
        let err = require_secret("RAG_CHAT_TEST_SURELY_UNSET_KEY").unwrap_err();
        assert!(err.to_string().contains("RAG_CHAT_TEST_SURELY_UNSET_KEY"));
    }
}
