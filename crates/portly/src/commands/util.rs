//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;

use portly_core::{Coordinator, Snapshot, WriteOutcome};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, the action is refused rather than assumed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Poll the switch once so reads see current state.
pub async fn fresh_snapshot(coordinator: &Coordinator) -> Result<Arc<Snapshot>, CliError> {
    Ok(coordinator.poll_once().await?)
}

/// One-line summary of a finished write.
pub fn describe_outcome(outcome: &WriteOutcome) -> String {
    let mut line = format!(
        "port {}: {} applied",
        outcome.port,
        outcome.op.to_string().replace('_', " ")
    );
    if outcome.attempts > 1 {
        line.push_str(&format!(" after {} attempts", outcome.attempts));
    }
    if !outcome.refreshed {
        line.push_str(" (port state not yet refreshed)");
    }
    line
}
