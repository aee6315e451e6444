use async_trait::async_trait;
use ota_core::ConfirmGate;
use ota_observe::Console;
use tracing::warn;

/// Asks the operator on stdin before the update stage starts.
pub struct StdinConfirm {
    console: Console,
}

impl StdinConfirm {
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

#[async_trait]
impl ConfirmGate for StdinConfirm {
    async fn confirm(&self, approved: &[String]) -> bool {
        let console = &self.console;
        console.line(format!("\n{} controllers will be updated:", approved.len()));
        for uid in approved {
            console.line(format!("  {uid}"));
        }
        console.line(console.blue("Press Enter to continue, type 'n' to cancel or Ctrl+C to exit."));

        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|n| (n, line))
        })
        .await;
        match answer {
            Ok(Ok((0, _))) => false,
            Ok(Ok((_, line))) => is_affirmative(&line),
            Ok(Err(e)) => {
                warn!(error = %e, "failed to read confirmation");
                false
            }
            Err(e) => {
                warn!(error = %e, "confirmation prompt aborted");
                false
            }
        }
    }
}

/// Empty input (plain Enter), `y` and `yes` proceed; anything else cancels.
fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
}
