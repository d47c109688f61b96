// Shared transport configuration and the shell seam.
//
// The session manager only ever talks to a `Connector` that hands out
// interactive `Shell`s. The production connector speaks SSH (see
// `ssh.rs`); tests plug in scripted shells instead.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Error;

/// Connection parameters for a single switch.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Bound on TCP connect + SSH handshake + authentication.
    pub connect_timeout: Duration,
    /// Terminal width requested for the PTY. Wide enough that the switch
    /// does not wrap table rows.
    pub terminal_width: u32,
}

impl TransportConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password,
            ..Self::default()
        }
    }

    /// `host:port` label used in logs and errors.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            username: "manager".into(),
            password: SecretString::from(String::new()),
            connect_timeout: Duration::from_secs(10),
            terminal_width: 200,
        }
    }
}

/// An interactive CLI shell on the device.
///
/// Implementations deliver raw bytes exactly as the device sends them;
/// prompt stripping, paging and ANSI cleanup happen in the batch executor.
#[async_trait]
pub trait Shell: Send {
    /// Write `data` to the shell's stdin.
    async fn send(&mut self, data: &str) -> Result<(), Error>;

    /// Wait for the next chunk of output. `Ok(None)` means the remote
    /// side closed the channel.
    async fn recv(&mut self) -> Result<Option<String>, Error>;

    /// Close the shell and its underlying connection. Never fails;
    /// errors during teardown are logged and swallowed.
    async fn close(&mut self);
}

/// Opens fresh authenticated shells.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect, authenticate and return a shell that is ready for
    /// commands (paging disabled, banner drained).
    async fn connect(&self) -> Result<Box<dyn Shell>, Error>;

    /// Human-readable endpoint for diagnostics.
    fn endpoint(&self) -> String;
}
