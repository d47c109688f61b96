// ── Runtime coordinator configuration ──
//
// Describes which switch to talk to and how hard to poll it. Carries
// credential data and tuning, but never touches disk. The CLI builds a
// `CoordinatorConfig` from a profile and hands it in.

use std::collections::BTreeSet;
use std::time::Duration;

use portly_api::TransportConfig;
use secrecy::SecretString;

use crate::error::CoreError;

/// Configuration for coordinating a single switch.
///
/// Built by the CLI, passed to `Coordinator` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// SSH endpoint and credentials.
    pub transport: TransportConfig,
    /// Number of front-panel ports. Every snapshot carries exactly this many.
    pub port_count: u16,
    /// Period of the background full poll.
    pub poll_interval: Duration,
    /// Ports kept in the model but hidden from consumers and writes.
    pub excluded_ports: BTreeSet<u16>,
    /// Ports whose PoE may not be toggled.
    pub excluded_poe: BTreeSet<u16>,
    /// Longest wait for the shared device session.
    pub acquire_timeout: Duration,
    /// Per-command sentinel deadline.
    pub command_timeout: Duration,
    /// Deadline for a whole batch on one session acquisition.
    pub batch_timeout: Duration,
    /// Longest a caller waits for a queued write to finish.
    pub write_timeout: Duration,
    /// Consecutive failed polls before the switch is declared offline.
    pub offline_threshold: u32,
    /// Retries after the first failed write attempt.
    pub write_retries: u32,
    /// Base delay between write retries; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Upper bound of the per-consumer stagger offset.
    pub stagger_max: Duration,
    /// Byte delta per poll above which a port counts as active.
    pub activity_threshold_bytes: u64,
}

impl CoordinatorConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            transport: TransportConfig::new(host, username, password),
            ..Self::default()
        }
    }

    /// Reject configurations the coordinator cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |message: &str| {
            Err(CoreError::Config {
                message: message.to_owned(),
            })
        };

        if self.transport.host.trim().is_empty() {
            return invalid("host must not be empty");
        }
        if self.transport.username.trim().is_empty() {
            return invalid("username must not be empty");
        }
        if self.port_count == 0 {
            return invalid("port_count must be at least 1");
        }
        if self.poll_interval.is_zero() {
            return invalid("poll_interval must be positive");
        }
        if self.offline_threshold == 0 {
            return invalid("offline_threshold must be at least 1");
        }
        if self.command_timeout.is_zero() || self.batch_timeout < self.command_timeout {
            return invalid("batch_timeout must be at least command_timeout, and both positive");
        }
        if let Some(port) = self
            .excluded_ports
            .iter()
            .chain(&self.excluded_poe)
            .find(|p| **p == 0 || **p > self.port_count)
        {
            return Err(CoreError::Config {
                message: format!("excluded port {port} is outside 1..={}", self.port_count),
            });
        }
        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            port_count: 24,
            poll_interval: Duration::from_secs(30),
            excluded_ports: BTreeSet::new(),
            excluded_poe: BTreeSet::new(),
            acquire_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(8),
            batch_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(180),
            offline_threshold: 3,
            write_retries: 2,
            retry_backoff: Duration::from_millis(500),
            stagger_max: Duration::from_secs(15),
            activity_threshold_bytes: 1000,
        }
    }
}
