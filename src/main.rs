//! # rag-chat CLI
//!
//! Builds an in-memory index over a Markdown directory and answers
//! questions about it with a generative model.
//!
//! ## Usage
//!
//! ```bash
//! rag-chat [--config ./rag-chat.toml] [--docs ./docs] [--top-k 2] [--debug] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag-chat chat` | Build the index and start the interactive loop (default) |
//! | `rag-chat ask "<question>"` | Build the index, answer one question, exit |
//! | `rag-chat index` | Build the index and print a summary |
//! | `rag-chat index --dry-run` | Count documents and chunks without embedding |
//!
//! ## Environment
//!
//! `GEMINI_API_KEY` / `OPENAI_API_KEY` are read from the environment or a
//! `.env` file in the working directory. `RAG_LOG` sets the log filter
//! (e.g. `RAG_LOG=rag_chat=debug`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rag_chat::config;
use rag_chat::ingest;
use rag_chat::progress::ProgressMode;
use rag_chat::repl;
use rag_chat::session::{format_snippets, ChatSession};

/// Retrieval-augmented chat over a local Markdown corpus.
///
/// Every run re-reads the corpus and rebuilds the index before the first
/// question is accepted.
#[derive(Parser)]
#[command(
    name = "rag-chat",
    about = "Retrieval-augmented chat over a local Markdown corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Corpus root directory (overrides `corpus.root`).
    #[arg(long, global = true)]
    docs: Option<PathBuf>,

    /// Number of chunks retrieved per question (overrides `retrieval.top_k`).
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Verbose logging, annotated citations and a snippet dump per answer.
    #[arg(long, global = true)]
    debug: bool,

    /// Indexing progress on stderr. Defaults to `human` on a TTY, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the interactive chat loop.
    ///
    /// Type a question per line; `quit`, `exit` or `sair` ends the session.
    Chat,

    /// Answer a single question and exit.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Build the index and print a summary.
    Index {
        /// Only load and chunk the corpus; no embedding provider is called.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Filter used when `RAG_LOG` is unset. Debug mode only raises this
/// crate's own targets; HTTP client internals stay at `warn`.
fn default_log_filter(debug: bool) -> &'static str {
    if debug {
        "warn,rag_chat=debug,rag_chat_core=debug"
    } else {
        "warn"
    }
}

fn init_tracing(debug: bool) {
    let default = default_log_filter(debug);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RAG_LOG").unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut cfg = config::load_config(cli.config.as_deref())?;
    if let Some(docs) = cli.docs {
        cfg.corpus.root = docs;
    }
    if let Some(top_k) = cli.top_k {
        cfg.retrieval.top_k = top_k;
    }
    cfg.chat.debug |= cli.debug;
    cfg.validate()?;

    init_tracing(cfg.chat.debug);

    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let mut session = ChatSession::start(&cfg, progress.as_ref()).await?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            repl::run_repl(&mut session, stdin, &mut stdout).await?;
        }
        Commands::Ask { question } => {
            let mut session = ChatSession::start(&cfg, progress.as_ref()).await?;
            let answer = session.ask(&question).await?;
            println!("\n{}", answer.text);
            if session.debug() {
                println!("\n{}", format_snippets(&answer.retrieved));
            }
        }
        Commands::Index { dry_run } => {
            ingest::run_index(&cfg, dry_run, progress.as_ref()).await?;
        }
    }

    Ok(())
}
