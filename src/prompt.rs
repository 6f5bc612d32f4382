//! Operator confirmations.

use std::future::Future;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Asks the operator a yes/no question. Declining never sends anything.
pub trait UserPrompt: Send + Sync {
    fn confirm(&self, title: &str, question: &str) -> impl Future<Output = bool> + Send;
}

/// Answers every question the same way.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl UserPrompt for AutoConfirm {
    async fn confirm(&self, _title: &str, _question: &str) -> bool {
        self.0
    }
}

/// Asks on the terminal, reading y/N from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl UserPrompt for TerminalPrompt {
    async fn confirm(&self, title: &str, question: &str) -> bool {
        let mut stdout = tokio::io::stdout();
        let text = format!("{title}\n{question} [y/N] ");
        if stdout.write_all(text.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            return false;
        }

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(_) => is_yes(&line),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
