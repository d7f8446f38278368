//! Answer generation backends.
//!
//! A [`Generator`] turns an assembled prompt into answer text. Providers
//! mirror the embedding side:
//! - **[`GeminiGenerator`]**: `models/{model}:generateContent`
//! - **[`OpenAIGenerator`]**: `POST /v1/chat/completions`
//! - **[`OllamaGenerator`]**: `POST /api/generate` (non-streaming)
//!
//! Generation is single-shot: the full answer is returned at once.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::config::{require_secret, GenerationConfig};
use crate::embedding::{GEMINI_BASE_URL, OLLAMA_BASE_URL, OPENAI_BASE_URL};
use crate::http;

/// A text-generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Produce the answer text for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Create the configured [`Generator`].
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiGenerator::new(
            config,
            require_secret("GEMINI_API_KEY")?,
        )?)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(
            config,
            require_secret("OPENAI_API_KEY")?,
        )?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

/// Shared connection settings for every provider.
struct Endpoint {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl Endpoint {
    fn new(config: &GenerationConfig, default_base: &str) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| default_base.to_string()),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }
}

// ============ Gemini ============

pub struct GeminiGenerator {
    endpoint: Endpoint,
    api_key: SecretString,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig, api_key: SecretString) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::new(config, GEMINI_BASE_URL)?,
            api_key,
        })
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let parts = json["candidates"][0]["content"]["parts"]
        .as_array()
        .context("Invalid Gemini response: no candidate content")?;
    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    Ok(text)
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.endpoint.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let ep = &self.endpoint;
        let model = ep.model.trim_start_matches("models/");
        let url = format!("{}/v1beta/models/{}:generateContent", ep.base_url, model);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let json = http::send_json(
            || {
                ep.client
                    .post(&url)
                    .header("x-goog-api-key", self.api_key.expose_secret())
                    .json(&body)
            },
            ep.max_retries,
            "Gemini",
        )
        .await?;
        parse_gemini_response(&json)
    }
}

// ============ OpenAI ============

pub struct OpenAIGenerator {
    endpoint: Endpoint,
    api_key: SecretString,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig, api_key: SecretString) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::new(config, OPENAI_BASE_URL)?,
            api_key,
        })
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .context("Invalid OpenAI response: no message content")
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.endpoint.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let ep = &self.endpoint;
        let url = format!("{}/v1/chat/completions", ep.base_url);
        let body = serde_json::json!({
            "model": ep.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let json = http::send_json(
            || {
                ep.client
                    .post(&url)
                    .bearer_auth(self.api_key.expose_secret())
                    .json(&body)
            },
            ep.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_response(&json)
    }
}

// ============ Ollama ============

pub struct OllamaGenerator {
    endpoint: Endpoint,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::new(config, OLLAMA_BASE_URL)?,
        })
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<String> {
    json["response"]
        .as_str()
        .map(str::to_string)
        .context("Invalid Ollama response: missing 'response' field")
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.endpoint.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let ep = &self.endpoint;
        let url = format!("{}/api/generate", ep.base_url);
        let body = serde_json::json!({
            "model": ep.model,
            "prompt": prompt,
            "stream": false,
        });

        let json = http::send_json(|| ep.client.post(&url).json(&body), ep.max_retries, "Ollama")
            .await
            .with_context(|| format!("is Ollama running at {}?", ep.base_url))?;
        parse_ollama_response(&json)
    }
}
