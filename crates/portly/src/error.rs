//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use portly_config::ConfigError;
use portly_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach switch at {host}")]
    #[diagnostic(
        code(portly::connection_failed),
        help(
            "Check that the switch is up and SSH is enabled.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { host: String, reason: String },

    #[error("Switch is offline after {consecutive_failures} failed polls")]
    #[diagnostic(
        code(portly::offline),
        help("Run with -v to see why polls are failing, then retry once the switch answers.")
    )]
    Offline { consecutive_failures: u32 },

    #[error("The switch has not returned any readable state yet")]
    #[diagnostic(
        code(portly::no_data),
        help("Neither interface listing could be read. Run with -vv to see the raw failure.")
    )]
    NoData,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(portly::auth_failed),
        help(
            "Verify the SSH username and password.\n\
             Run: portly config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No password configured for profile '{profile}'")]
    #[diagnostic(
        code(portly::no_credentials),
        help(
            "Store one with: portly config set-password --profile {profile}\n\
             Or set the PORTLY_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("Port {index} not found (switch has {port_count} ports)")]
    #[diagnostic(code(portly::not_found), help("Run: portly ports list"))]
    PortNotFound { index: u16, port_count: u16 },

    #[error("{what} on port {index} is excluded in this profile")]
    #[diagnostic(
        code(portly::excluded),
        help("Remove the port from exclude_ports / exclude_poe to manage it.")
    )]
    Excluded { what: String, index: u16 },

    // ── Writes ───────────────────────────────────────────────────────

    #[error("Switch rejected '{command}': {message}")]
    #[diagnostic(code(portly::rejected))]
    Rejected { command: String, message: String },

    #[error("Change failed after {attempts} attempts: {last_error}")]
    #[diagnostic(code(portly::retries_exhausted))]
    RetriesExhausted { attempts: u32, last_error: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(portly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(portly::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No switch configured")]
    #[diagnostic(
        code(portly::no_config),
        help(
            "Pass --host, or add a profile to the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(portly::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(portly::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────

    #[error("Switch did not answer within {seconds}s")]
    #[diagnostic(
        code(portly::timeout),
        help("Raise command_timeout_secs in the profile or check switch load.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(portly::render))]
    Render(String),

    #[error("{0}")]
    #[diagnostic(code(portly::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Offline { .. } | Self::NoData => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::PortNotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Excluded { .. } => exit_code::PERMISSION,
            Self::Rejected { .. } | Self::RetriesExhausted { .. } => exit_code::REJECTED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectFailed { host, reason } => CliError::ConnectionFailed { host, reason },

            CoreError::AuthFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },

            CoreError::SessionLost { reason } => CliError::ConnectionFailed {
                host: "(session)".into(),
                reason,
            },

            CoreError::SessionBusy { timeout_ms } => CliError::Timeout {
                seconds: timeout_ms.div_ceil(1000),
            },

            CoreError::ReadTimeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::DeviceOffline {
                consecutive_failures,
            } => CliError::Offline {
                consecutive_failures,
            },

            CoreError::NoSnapshot | CoreError::ParseFailed { .. } => CliError::NoData,

            CoreError::PortNotFound { index, port_count } => {
                CliError::PortNotFound { index, port_count }
            }

            CoreError::PortExcluded { index } => CliError::Excluded {
                what: "Port".into(),
                index,
            },

            CoreError::PoeExcluded { index } => CliError::Excluded {
                what: "PoE".into(),
                index,
            },

            CoreError::PoeNotSupported { index } => CliError::Validation {
                field: "port".into(),
                reason: format!("port {index} has no PoE"),
            },

            CoreError::CommandRejected { command, message } => {
                CliError::Rejected { command, message }
            }

            CoreError::RetriesExhausted {
                attempts,
                last_error,
            } => CliError::RetriesExhausted {
                attempts,
                last_error,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "profile".into(),
                reason: message,
            },

            CoreError::CoordinatorStopped => {
                CliError::Internal("coordinator stopped before the command finished".into())
            }

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => {
                let available = portly_config::load_config_or_default()
                    .profiles
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ");
                CliError::ProfileNotFound {
                    name: profile,
                    available: if available.is_empty() {
                        "(none)".into()
                    } else {
                        available
                    },
                }
            }
            other => CliError::Config(other),
        }
    }
}
