use std::io::{self, Write};

use async_trait::async_trait;

use avamove_core::{MigrateError, PrefixMap};
use avamove_migrate::{ConfirmGate, RunOutcome};

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Interpret an interactive answer. Anything but an explicit yes is a no.
pub fn parse_yes(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Render a run outcome as plain text. Every arm leads with the initial
/// consistency report.
pub fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Aborted { report } => {
            format!(
                "{}\n\nRecords and stores disagree; nothing was changed.",
                report
            )
        }
        RunOutcome::DryRunComplete { report, pending } => {
            format!(
                "{}\n\nDry run: {} record(s) would be migrated.",
                report, pending
            )
        }
        RunOutcome::Declined { report, pending } => {
            format!(
                "{}\n\nDeclined: {} record(s) left untouched.",
                report, pending
            )
        }
        RunOutcome::Done {
            report,
            summary,
            final_report,
        } => format!("{}\n\n{}\n\n{}", report, summary, final_report),
    }
}

/// Confirmation gate that prompts on stdin before a batch runs.
pub struct StdinConfirm {
    legacy_prefix: String,
    production_prefix: String,
}

impl StdinConfirm {
    pub fn new(prefixes: &PrefixMap) -> Self {
        Self {
            legacy_prefix: prefixes.legacy().to_string(),
            production_prefix: prefixes.production().to_string(),
        }
    }
}

#[async_trait]
impl ConfirmGate for StdinConfirm {
    async fn confirm(&self, pending: usize) -> Result<bool, MigrateError> {
        let prompt = format!(
            "Migrate {} avatar(s) from \"{}\" to \"{}\"? [y/N] ",
            pending, self.legacy_prefix, self.production_prefix
        );
        // Blocking stdin read, moved off the runtime threads.
        let answer = tokio::task::spawn_blocking(move || {
            let mut out = io::stdout();
            out.write_all(prompt.as_bytes())?;
            out.flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            Ok::<String, io::Error>(line)
        })
        .await
        .map_err(|e| MigrateError::Internal(format!("confirmation prompt failed: {}", e)))??;
        Ok(parse_yes(&answer))
    }
}
