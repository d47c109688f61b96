// ── Core error types ──
//
// User-facing errors from portly-core. These are NOT transport errors;
// they represent what went wrong from the consumer's perspective.

use thiserror::Error;

use crate::model::FailureCause;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to switch at {host}: {reason}")]
    ConnectFailed { host: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    #[error("Device session busy: gave up after {timeout_ms}ms")]
    SessionBusy { timeout_ms: u64 },

    #[error("Device session lost: {reason}")]
    SessionLost { reason: String },

    #[error("Device did not answer within {timeout_secs}s")]
    ReadTimeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Could not parse '{command}' output: {reason}")]
    ParseFailed {
        command: String,
        reason: String,
        fragment: Option<String>,
    },

    #[error("No snapshot yet: the first poll has not completed")]
    NoSnapshot,

    #[error("Port {index} does not exist (switch has {port_count} ports)")]
    PortNotFound { index: u16, port_count: u16 },

    #[error("Port {index} is excluded from monitoring")]
    PortExcluded { index: u16 },

    #[error("PoE on port {index} is excluded from control")]
    PoeExcluded { index: u16 },

    // ── Availability ─────────────────────────────────────────────────
    #[error("Switch is offline after {consecutive_failures} failed polls")]
    DeviceOffline { consecutive_failures: u32 },

    // ── Write errors ─────────────────────────────────────────────────
    #[error("Switch rejected '{command}': {message}")]
    CommandRejected { command: String, message: String },

    #[error("Write failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Port {index} has no PoE")]
    PoeNotSupported { index: u16 },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Coordinator is not running")]
    CoordinatorStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if the same operation might succeed when retried
    /// without operator intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. }
                | Self::SessionBusy { .. }
                | Self::SessionLost { .. }
                | Self::ReadTimeout { .. }
        )
    }

    /// How a failed poll is classified for health tracking.
    pub fn failure_cause(&self) -> FailureCause {
        match self {
            Self::AuthFailed { .. } => FailureCause::Auth,
            Self::ConnectFailed { .. } => FailureCause::Connect,
            Self::SessionBusy { .. } | Self::ReadTimeout { .. } => FailureCause::Timeout,
            Self::ParseFailed { .. } | Self::NoSnapshot => FailureCause::Parse,
            _ => FailureCause::Session,
        }
    }
}

impl From<portly_api::Error> for CoreError {
    fn from(err: portly_api::Error) -> Self {
        match err {
            portly_api::Error::Connect { host, reason } => CoreError::ConnectFailed { host, reason },
            portly_api::Error::Authentication { message } => CoreError::AuthFailed { message },
            portly_api::Error::AcquireTimeout { timeout_ms } => CoreError::SessionBusy { timeout_ms },
            portly_api::Error::SessionClosed { reason } => CoreError::SessionLost { reason },
            portly_api::Error::CommandTimeout { timeout_secs, .. }
            | portly_api::Error::Timeout { timeout_secs } => CoreError::ReadTimeout { timeout_secs },
            portly_api::Error::CommandRejected { command, message } => {
                CoreError::CommandRejected { command, message }
            }
            portly_api::Error::Ssh(russh_err) => {
                if matches!(russh_err, russh::Error::NotAuthenticated) {
                    CoreError::AuthFailed {
                        message: russh_err.to_string(),
                    }
                } else {
                    CoreError::SessionLost {
                        reason: russh_err.to_string(),
                    }
                }
            }
            portly_api::Error::Io(e) => CoreError::SessionLost {
                reason: e.to_string(),
            },
        }
    }
}
