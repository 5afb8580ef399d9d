//! Interactive confirmation on the terminal.

use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use marquee_core::{Confirmer, Simulation};

/// Prints the simulated plan and reads a `y/n` answer from stdin.
///
/// Anything but `y` or `yes` declines, as does a closed stdin.
#[derive(Debug, Default)]
pub struct StdinConfirmer;

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, simulation: &Simulation) -> bool {
        {
            let mut out = std::io::stdout().lock();
            for line in &simulation.lines {
                let _ = writeln!(out, "  {}", line);
            }
            let _ = write!(out, "Apply {}? [y/N] ", simulation.summary());
            let _ = out.flush();
        }

        let mut answer = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut answer).await {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                warn!("Could not read confirmation: {}", e);
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
