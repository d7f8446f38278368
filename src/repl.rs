//! Interactive read-eval-print loop over a [`ChatSession`].
//!
//! Reads one question per line. Blank lines are ignored; `quit`, `exit`
//! or `sair` (any case) and end of input close the loop. A failed turn is
//! reported and the loop keeps going with the conversation unchanged.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::session::{format_snippets, ChatSession};

const EXIT_WORDS: &[&str] = &["quit", "exit", "sair"];

pub fn is_exit_word(line: &str) -> bool {
    let line = line.trim();
    EXIT_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w))
}

/// Run the loop until an exit word or end of input.
///
/// # Errors
///
/// Only I/O errors on `input` or `output` end the loop with an error;
/// retrieval and generation failures are printed and skipped.
pub async fn run_repl<R, W>(session: &mut ChatSession, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output
        .write_all(b"\nRAG chat ready! (type 'quit' or 'exit' to exit)\n")
        .await?;
    if session.debug() {
        output.write_all(b"DEBUG MODE ENABLED\n").await?;
    }

    let mut lines = input.lines();
    loop {
        output.write_all(b"\nYou: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\n").await?;
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit_word(query) {
            output.write_all(b"Exiting...\n").await?;
            break;
        }

        match session.ask(query).await {
            Ok(answer) => {
                let mut text = format!("\nAgent AI:\n\n{}\n", answer.text);
                if session.debug() {
                    text.push_str("\n\n");
                    text.push_str(&format_snippets(&answer.retrieved));
                }
                output.write_all(text.as_bytes()).await?;
            }
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "turn failed");
                output
                    .write_all(format!("Error: {:#}\n", e).as_bytes())
                    .await?;
            }
        }
    }

    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::Generator;
    use anyhow::bail;
    use async_trait::async_trait;
    use rag_chat_core::{CitationMode, Embedder, PromptAssembler, Retriever, VectorIndex};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct NullEmbedder;

    #[async_trait]
    impl Embedder for NullEmbedder {
        fn model_name(&self) -> &str {
            "null"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            bail!("empty index should not embed queries")
        }
    }

    /// Echoes the question; fails on any question containing "boom".
    struct EchoGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let question = prompt
                .split("USER QUESTION:\n")
                .nth(1)
                .and_then(|rest| rest.lines().next())
                .unwrap_or_default();
            if question.contains("boom") {
                bail!("generation exploded");
            }
            Ok(format!("echo: {}", question))
        }
    }

    fn session(generator: Arc<EchoGenerator>) -> ChatSession {
        ChatSession::new(
            Retriever::new(Arc::new(NullEmbedder), VectorIndex::empty()),
            generator,
            PromptAssembler::new(6, CitationMode::Concise),
            2,
        )
    }

    async fn run(input: &str) -> (String, ChatSession, Arc<EchoGenerator>) {
        let generator = Arc::new(EchoGenerator {
            calls: AtomicUsize::new(0),
        });
        let mut chat = session(generator.clone());
        let mut out = Vec::new();
        run_repl(&mut chat, input.as_bytes(), &mut out).await.unwrap();
        (String::from_utf8(out).unwrap(), chat, generator)
    }

    #[test]
    fn test_exit_words() {
        assert!(is_exit_word("quit"));
        assert!(is_exit_word("  EXIT "));
        assert!(is_exit_word("Sair"));
        assert!(!is_exit_word("quitting"));
    }

    #[tokio::test]
    async fn test_answers_until_exit_word() {
        let (out, chat, generator) = run("hello\nquit\nnever asked\n").await;
        assert!(out.contains("\nAgent AI:\n\necho: hello\n"));
        assert!(out.contains("Exiting..."));
        assert!(!out.contains("never asked"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(chat.history().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let (_, chat, generator) = run("\n   \nhello\n").await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(chat.history().len(), 1);
    }

    #[tokio::test]
    async fn test_end_of_input_ends_loop() {
        let (out, chat, _) = run("").await;
        assert!(out.starts_with("\nRAG chat ready!"));
        assert!(chat.history().is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_is_reported_and_loop_continues() {
        let (out, chat, generator) = run("boom\nafter\nexit\n").await;
        assert!(out.contains("Error: Failed to generate an answer: generation exploded"));
        assert!(out.contains("echo: after"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(chat.history().len(), 1);
        assert_eq!(chat.history().recent(1)[0].question, "after");
    }
}
