use thiserror::Error;

/// Top-level error type for the `portly-api` crate.
///
/// Covers every failure mode of the device CLI protocol: connecting,
/// authenticating, waiting for the shared session, and talking to the
/// switch over an open shell. `portly-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// TCP connect or SSH handshake failed.
    #[error("Cannot connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    /// The switch rejected the supplied credentials.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Session ─────────────────────────────────────────────────────
    /// Another caller held the session for longer than the acquire timeout.
    #[error("Timed out after {timeout_ms}ms waiting for the device session")]
    AcquireTimeout { timeout_ms: u64 },

    /// The shell channel closed or a read/write on it failed.
    #[error("Session closed: {reason}")]
    SessionClosed { reason: String },

    /// A single command produced no sentinel within its deadline.
    #[error("Command '{command}' timed out after {timeout_secs}s")]
    CommandTimeout { command: String, timeout_secs: u64 },

    /// A whole batch ran past its overall deadline.
    #[error("Command batch timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Commands ────────────────────────────────────────────────────
    /// The CLI answered a command with an error message.
    #[error("Command '{command}' rejected: {message}")]
    CommandRejected { command: String, message: String },

    // ── Transport internals ─────────────────────────────────────────
    /// Low-level SSH protocol error.
    #[error("SSH protocol error: {0}")]
    Ssh(#[from] russh::Error),

    /// Local I/O failure while talking to the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if retrying the same operation could succeed.
    ///
    /// Authentication failures and rejected commands need an operator
    /// to change something first, so they are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connect { .. }
            | Self::AcquireTimeout { .. }
            | Self::SessionClosed { .. }
            | Self::Timeout { .. }
            | Self::CommandTimeout { .. }
            | Self::Io(_) => true,
            Self::Ssh(e) => !matches!(e, russh::Error::NotAuthenticated),
            Self::Authentication { .. } | Self::CommandRejected { .. } => false,
        }
    }

    /// Returns `true` if the error means the current shell can no longer
    /// be trusted and must be torn down.
    pub fn breaks_session(&self) -> bool {
        matches!(
            self,
            Self::SessionClosed { .. }
                | Self::Timeout { .. }
                | Self::CommandTimeout { .. }
                | Self::Ssh(_)
                | Self::Io(_)
        )
    }
}
