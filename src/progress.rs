//! Index-build progress reporting.
//!
//! Startup embeds the whole corpus before the chat loop opens, which can
//! take a while on large corpora. Progress is emitted on **stderr** so
//! stdout stays reserved for answers and summaries.

use std::io::Write;

/// A single progress event emitted while building the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexProgressEvent {
    /// Documents loaded and chunked; embedding is about to start.
    Chunked { documents: u64, chunks: u64 },
    /// `n` of `total` embedding batches have completed.
    Embedding { n: u64, total: u64 },
    /// Index built.
    Done { vectors: u64, dims: u64 },
}

/// Receives progress events from the ingest pipeline.
pub trait IndexProgressReporter: Send + Sync {
    fn report(&self, event: IndexProgressEvent);
}

/// Human-friendly progress on stderr: "index  embedding  3 / 12 batches".
pub struct StderrProgress;

impl IndexProgressReporter for StderrProgress {
    fn report(&self, event: IndexProgressEvent) {
        let line = match &event {
            IndexProgressEvent::Chunked { documents, chunks } => format!(
                "index  chunked  {} documents into {} chunks\n",
                format_number(*documents),
                format_number(*chunks)
            ),
            IndexProgressEvent::Embedding { n, total } => format!(
                "index  embedding  {} / {} batches\n",
                format_number(*n),
                format_number(*total)
            ),
            IndexProgressEvent::Done { vectors, dims } => format!(
                "index  done  {} vectors ({} dims)\n",
                format_number(*vectors),
                dims
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IndexProgressReporter for JsonProgress {
    fn report(&self, event: IndexProgressEvent) {
        let obj = match &event {
            IndexProgressEvent::Chunked { documents, chunks } => serde_json::json!({
                "event": "progress",
                "phase": "chunked",
                "documents": documents,
                "chunks": chunks
            }),
            IndexProgressEvent::Embedding { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "embedding",
                "n": n,
                "total": total
            }),
            IndexProgressEvent::Done { vectors, dims } => serde_json::json!({
                "event": "progress",
                "phase": "done",
                "vectors": vectors,
                "dims": dims
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IndexProgressReporter for NoProgress {
    fn report(&self, _event: IndexProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IndexProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
