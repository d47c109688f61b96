//! Command dispatch: bridges CLI args -> coordinator calls -> output formatting.

pub mod config_cmd;
pub mod poe;
pub mod ports;
pub mod status;
pub mod util;
pub mod watch;

use portly_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a switch-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(coordinator, global).await,
        Command::Ports(args) => ports::handle(coordinator, args, global).await,
        Command::Poe(args) => poe::handle(coordinator, args, global).await,
        Command::Watch(args) => watch::handle(coordinator, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions never reach the switch".into(),
        )),
    }
}
