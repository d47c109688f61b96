// ── Connectivity and health ──

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Health derived from recent poll outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Health {
    #[default]
    Online,
    /// Still online, but the last poll (or more) failed.
    Degraded,
    Offline,
}

/// Why a poll failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureCause {
    Connect,
    Auth,
    Timeout,
    /// Empty or unparseable output.
    Parse,
    /// The shell dropped mid-batch.
    Session,
}

/// Observable connectivity of the switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityState {
    pub health: Health,
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<FailureCause>,
    pub last_poll_duration: Option<Duration>,
    pub polls_total: u64,
    pub polls_failed: u64,
}

impl ConnectivityState {
    pub fn is_online(&self) -> bool {
        self.health != Health::Offline
    }
}
