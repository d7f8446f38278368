//! Index construction.
//!
//! Coordinates the startup flow: corpus → chunking → embedding → index.
//! The whole corpus is embedded before the first question is accepted;
//! nothing is persisted, so every run rebuilds from the Markdown files.

use anyhow::{Context, Result};
use rag_chat_core::{chunk_document, Chunk, Embedder, VectorIndex};
use std::sync::Arc;

use crate::config::Config;
use crate::corpus;
use crate::embedding::{create_embedder, embed_all};
use crate::progress::{IndexProgressEvent, IndexProgressReporter};

/// Documents loaded and the chunks cut from them, in corpus order.
pub struct ChunkedCorpus {
    pub documents: usize,
    pub chunks: Vec<Chunk>,
}

/// Load the corpus and split every document into chunks.
pub fn chunk_corpus(config: &Config) -> Result<ChunkedCorpus> {
    let params = config.chunk_params()?;
    let docs = corpus::load_corpus(&config.corpus)?;

    let chunks: Vec<Chunk> = docs
        .iter()
        .flat_map(|doc| chunk_document(doc, &params))
        .collect();

    Ok(ChunkedCorpus {
        documents: docs.len(),
        chunks,
    })
}

/// Build the in-memory index, printing the startup banners.
///
/// An empty corpus produces an empty index without calling the embedder.
pub async fn build_index(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    progress: &dyn IndexProgressReporter,
) -> Result<VectorIndex> {
    let corpus = chunk_corpus(config)?;
    println!("Found {} markdown files. Chunking...", corpus.documents);
    progress.report(IndexProgressEvent::Chunked {
        documents: corpus.documents as u64,
        chunks: corpus.chunks.len() as u64,
    });

    if corpus.chunks.is_empty() {
        tracing::warn!(
            root = %config.corpus.root.display(),
            "no chunks to index; answers will not be grounded in any document"
        );
        return Ok(VectorIndex::empty());
    }

    println!(
        "{} chunks ready! Generating embeddings (this can take a while)...",
        corpus.chunks.len()
    );

    let texts: Vec<String> = corpus.chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embed_all(
        embedder,
        &texts,
        config.embedding.batch_size,
        config.embedding.concurrency,
        progress,
    )
    .await
    .context("Failed to embed the corpus")?;

    let index = VectorIndex::build(vectors.into_iter().zip(corpus.chunks))?;
    progress.report(IndexProgressEvent::Done {
        vectors: index.len() as u64,
        dims: index.dims() as u64,
    });
    tracing::info!(vectors = index.len(), dims = index.dims(), "index built");
    println!("Index built! Ready to answer queries");

    Ok(index)
}

/// `rag-chat index`: build the index and print a summary.
///
/// With `dry_run`, stop after chunking; no provider is contacted and no
/// credentials are needed.
pub async fn run_index(
    config: &Config,
    dry_run: bool,
    progress: &dyn IndexProgressReporter,
) -> Result<()> {
    if dry_run {
        let corpus = chunk_corpus(config)?;
        println!("index {} (dry-run)", config.corpus.root.display());
        println!("  documents: {}", corpus.documents);
        println!("  chunks: {}", corpus.chunks.len());
        return Ok(());
    }

    let embedder = create_embedder(&config.embedding)?;
    let model = embedder.model_name().to_string();
    let index = build_index(config, embedder, progress).await?;

    let documents = {
        let mut paths: Vec<&str> = index.chunks().map(|c| c.source_path.as_str()).collect();
        paths.dedup();
        paths.len()
    };

    println!("index {}", config.corpus.root.display());
    println!("  documents indexed: {}", documents);
    println!("  vectors: {}", index.len());
    println!("  dimensions: {}", index.dims());
    println!("  model: {}", model);
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Two-dimensional embedding: share of 'a' vs 'b' characters.
    struct LetterEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for LetterEmbedder {
        fn model_name(&self) -> &str {
            "letters"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let a = t.chars().filter(|c| *c == 'a').count() as f32;
                    let b = t.chars().filter(|c| *c == 'b').count() as f32;
                    vec![a, b]
                })
                .collect())
        }
    }

    struct UnreachableEmbedder;

    #[async_trait]
    impl Embedder for UnreachableEmbedder {
        fn model_name(&self) -> &str {
            "unreachable"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            bail!("embedder should not be called")
        }
    }

    fn config_for(root: &std::path::Path, window: usize, overlap: usize) -> Config {
        let mut config = Config::default();
        config.corpus.root = root.to_path_buf();
        config.chunking.window_chars = window;
        config.chunking.overlap_chars = overlap;
        config
    }

    #[test]
    fn test_chunk_corpus_counts() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("one.md"), "a".repeat(100)).unwrap();
        fs::write(tmp.path().join("two.md"), "short").unwrap();

        let corpus = chunk_corpus(&config_for(tmp.path(), 60, 20)).unwrap();
        assert_eq!(corpus.documents, 2);
        assert_eq!(corpus.chunks.len(), 3);
        assert_eq!(corpus.chunks[0].source_name, "one.md");
        assert_eq!(corpus.chunks[2].source_name, "two.md");
    }

    #[tokio::test]
    async fn test_build_index_embeds_every_chunk() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("doc.md"),
            format!("{}{}", "a".repeat(60), "b".repeat(40)),
        )
        .unwrap();

        let mut config = config_for(tmp.path(), 60, 20);
        config.embedding.batch_size = 1;
        let embedder = Arc::new(LetterEmbedder {
            calls: AtomicUsize::new(0),
        });
        let index = build_index(&config, embedder.clone(), &NoProgress)
            .await
            .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.dims(), 2);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(index.entry(0).unwrap().sequence_index, 0);
        assert_eq!(index.entry(1).unwrap().sequence_index, 1);
    }

    #[tokio::test]
    async fn test_empty_corpus_skips_embedding() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(tmp.path(), 60, 20);
        let index = build_index(&config, Arc::new(UnreachableEmbedder), &NoProgress)
            .await
            .unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_is_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("doc.md"), "content").unwrap();
        let config = config_for(tmp.path(), 60, 20);
        let err = build_index(&config, Arc::new(UnreachableEmbedder), &NoProgress)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to embed the corpus"));
    }

    #[tokio::test]
    async fn test_dry_run_needs_no_credentials() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("doc.md"), "content").unwrap();
        let mut config = config_for(tmp.path(), 60, 20);
        config.embedding.provider = "openai".to_string();
        run_index(&config, true, &NoProgress).await.unwrap();
    }
}
