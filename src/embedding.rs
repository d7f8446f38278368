//! Embedding providers and corpus-scale batched embedding.
//!
//! Implements the core [`Embedder`] trait for three backends:
//! - **[`GeminiEmbedder`]**: Google Generative Language `batchEmbedContents`
//!   (requires `GEMINI_API_KEY`).
//! - **[`OpenAIEmbedder`]**: `POST /v1/embeddings` (requires `OPENAI_API_KEY`).
//! - **[`OllamaEmbedder`]**: a local Ollama instance's `/api/embed`.
//!
//! [`embed_all`] drives a provider over the whole corpus: texts are split
//! into batches of `batch_size`, up to `concurrency` batches are in flight
//! at once, and results are reassembled by batch number so the output is
//! in input order no matter which batch finishes first.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use rag_chat::config::EmbeddingConfig;
//! # use rag_chat::embedding::create_embedder;
//! let config = EmbeddingConfig::default(); // provider = "gemini"
//! let embedder = create_embedder(&config).unwrap(); // needs GEMINI_API_KEY
//! assert_eq!(embedder.model_name(), "gemini-embedding-001");
//! ```

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rag_chat_core::embedding::{check_batch, finalize_vectors, reassemble_batches, Embedder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::config::{require_secret, EmbeddingConfig};
use crate::http;
use crate::progress::{IndexProgressEvent, IndexProgressReporter};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Create the configured [`Embedder`].
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"gemini"` | [`GeminiEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
///
/// # Errors
///
/// Unknown provider names and missing API keys are configuration errors.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiEmbedder::new(
            config,
            require_secret("GEMINI_API_KEY")?,
        )?)),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(
            config,
            require_secret("OPENAI_API_KEY")?,
        )?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Embed every text, returning unit-normalized vectors in input order.
///
/// Batches run concurrently when `concurrency > 1`. Each batch is tagged
/// with its number and the results are sorted back into place before
/// validation, so concurrency never reorders vectors relative to `texts`.
///
/// # Errors
///
/// The first failing batch aborts the whole run (remaining batches are
/// cancelled). Count and dimensionality violations are errors too.
pub async fn embed_all(
    embedder: Arc<dyn Embedder>,
    texts: &[String],
    batch_size: usize,
    concurrency: usize,
    progress: &dyn IndexProgressReporter,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let concurrency = concurrency.max(1);
    let batches: Vec<Vec<String>> = texts.chunks(batch_size).map(|b| b.to_vec()).collect();
    let total = batches.len() as u64;

    let mut pending = batches.into_iter().enumerate();
    let mut in_flight = JoinSet::new();
    let mut done: Vec<(usize, Vec<Vec<f32>>)> = Vec::with_capacity(total as usize);

    loop {
        while in_flight.len() < concurrency {
            let Some((tag, batch)) = pending.next() else {
                break;
            };
            let embedder = Arc::clone(&embedder);
            in_flight.spawn(async move {
                tracing::debug!(
                    batch = tag + 1,
                    total,
                    texts = batch.len(),
                    "processing batch"
                );
                let out = embedder.embed(&batch).await?;
                check_batch(batch.len(), &out)?;
                Ok::<_, anyhow::Error>((tag, out))
            });
        }

        let Some(joined) = in_flight.join_next().await else {
            break;
        };
        let (tag, vectors) = joined
            .context("embedding task panicked")?
            .with_context(|| format!("embedding batch failed ({})", embedder.model_name()))?;
        done.push((tag, vectors));
        progress.report(IndexProgressEvent::Embedding {
            n: done.len() as u64,
            total,
        });
    }

    Ok(finalize_vectors(reassemble_batches(done))?)
}

fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

// ============ Gemini ============

/// Embedding provider using the Gemini `batchEmbedContents` endpoint.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: SecretString) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[derive(Deserialize)]
struct GeminiEmbeddingResponse {
    embeddings: Vec<GeminiEmbedding>,
}

#[derive(Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

/// Extract `embeddings[].values` in order.
fn parse_gemini_response(json: serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let resp: GeminiEmbeddingResponse = serde_json::from_value(json)
        .context("Invalid Gemini response: missing embeddings array")?;
    Ok(resp.embeddings.into_iter().map(|e| e.values).collect())
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = model_path(&self.model);
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|t| {
                serde_json::json!({
                    "model": model,
                    "content": { "parts": [{ "text": t }] },
                })
            })
            .collect();
        let body = serde_json::json!({ "requests": requests });
        let url = format!("{}/v1beta/{}:batchEmbedContents", self.base_url, model);

        let json = http::send_json(
            || {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", self.api_key.expose_secret())
                    .json(&body)
            },
            self.max_retries,
            "Gemini",
        )
        .await?;
        parse_gemini_response(json)
    }
}

// ============ OpenAI ============

/// Embedding provider using the OpenAI embeddings API (or a compatible
/// gateway via `embedding.url`).
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: SecretString) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Extract `data[].embedding`, ordered by `data[].index` when present.
fn parse_openai_response(json: serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let mut resp: OpenAIEmbeddingResponse = serde_json::from_value(json)
        .context("Invalid OpenAI response: missing data array")?;
    resp.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
    Ok(resp.data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/v1/embeddings", self.base_url);

        let json = http::send_json(
            || {
                self.client
                    .post(&url)
                    .bearer_auth(self.api_key.expose_secret())
                    .json(&body)
            },
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_response(json)
    }
}

// ============ Ollama ============

/// Embedding provider using a local Ollama instance.
///
/// Requires Ollama to be running with the model pulled
/// (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

fn parse_ollama_response(json: serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let resp: OllamaEmbeddingResponse = serde_json::from_value(json)
        .context("Invalid Ollama response: missing embeddings array")?;
    Ok(resp.embeddings)
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/api/embed", self.base_url);

        let json = http::send_json(
            || self.client.post(&url).json(&body),
            self.max_retries,
            "Ollama",
        )
        .await
        .with_context(|| format!("is Ollama running at {}?", self.base_url))?;
        parse_ollama_response(json)
    }
}
