//! Markdown corpus discovery and loading.
//!
//! Walks `corpus.root` recursively and loads every file matching the
//! include globs (default `**/*.md`) as a [`Document`]. Version-control and
//! build directories are always excluded.
//!
//! Loading is forgiving: a missing or empty root yields an empty corpus
//! (chat still works, just ungrounded), and an unreadable file is skipped
//! with a warning. Only a corpus where *every* candidate file fails to load
//! is an error.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rag_chat_core::Document;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::CorpusConfig;

/// Find candidate files under the corpus root, sorted by path.
pub fn discover(config: &CorpusConfig) -> Result<Vec<PathBuf>> {
    let root = &config.root;
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "corpus root is not a directory; using an empty corpus");
        return Ok(Vec::new());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable corpus entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude_set.is_match(relative) || !include_set.is_match(relative) {
            continue;
        }
        paths.push(path.to_path_buf());
    }

    paths.sort();
    Ok(paths)
}

/// Discover and read the corpus.
pub fn load_corpus(config: &CorpusConfig) -> Result<Vec<Document>> {
    let paths = discover(config)?;
    load_documents(&paths)
}

/// Read each path as UTF-8 text, skipping files that cannot be read.
///
/// # Errors
///
/// Fails only when `paths` is non-empty and none of them could be read.
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut docs = Vec::with_capacity(paths.len());
    let mut failed = 0usize;

    for path in paths {
        match read_document(path) {
            Ok(doc) => {
                tracing::debug!(path = %doc.path, chars = doc.text.chars().count(), "loaded file");
                docs.push(doc);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                failed += 1;
            }
        }
    }

    if docs.is_empty() && failed > 0 {
        bail!(
            "None of the {} markdown files under the corpus root could be read",
            failed
        );
    }

    Ok(docs)
}

fn read_document(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path)?;
    Ok(Document::new(path.display().to_string(), text))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
