//! Line-oriented prompt over stdin.
//!
//! Every prompt reads one line. End of input surfaces as
//! [`ConsoleError::Eof`], which the shell treats as a request to exit.

use fanout_engine::coordinator::{ConfirmationGate, DistributionPreview, RunOrigin, PREVIEW_LEN};
use fanout_types::units_to_whole;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Errors reading from the console.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Stdin was closed.
    #[error("input closed")]
    Eof,

    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared prompt reader.
pub struct Console {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Console {
    pub fn stdin() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// Print `question` and read the trimmed answer.
    pub async fn ask(&self, question: &str) -> Result<String, ConsoleError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;

        let mut lines = self.lines.lock().await;
        match lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(ConsoleError::Eof),
        }
    }

    /// Ask a yes/no question; anything but "yes"/"y" is no.
    pub async fn confirm(&self, question: &str) -> Result<bool, ConsoleError> {
        let answer = self.ask(question).await?;
        Ok(is_yes(&answer))
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "yes" | "y")
}

/// Confirmation gate that shows the planned distribution and asks.
pub struct ConsoleGate<'a> {
    console: &'a Console,
}

impl<'a> ConsoleGate<'a> {
    pub fn new(console: &'a Console) -> Self {
        Self { console }
    }
}

impl ConfirmationGate for ConsoleGate<'_> {
    fn origin(&self) -> RunOrigin {
        RunOrigin::Interactive
    }

    async fn confirm(&self, preview: &DistributionPreview<'_>) -> bool {
        let count = preview.recipient_count;
        println!();
        println!(
            "About to distribute {:.6} to {} addresses in {} transaction(s).",
            units_to_whole(preview.spendable_units),
            count,
            preview.batch_count()
        );
        println!(
            "Reserved for fees: {:.6}",
            units_to_whole(preview.budget.reserve_units)
        );
        for (i, recipient) in preview.top(PREVIEW_LEN).enumerate() {
            println!(
                "{:>3}. {}... {:.6}",
                i + 1,
                recipient.owner.short(12),
                recipient.allocated_amount
            );
        }
        if count > PREVIEW_LEN {
            println!("     ... and {} more", count - PREVIEW_LEN);
        }

        // A closed console declines.
        self.console
            .confirm("Continue with distribution? (yes/no): ")
            .await
            .unwrap_or(false)
    }
}
