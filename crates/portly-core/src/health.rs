// ── Health / offline detection ──
//
// A small state machine over poll outcomes. Only transitions are
// reported; staying in the same state is silent.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{ConnectivityState, FailureCause, Health};

/// A change of [`Health`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: Health,
    pub to: Health,
    pub consecutive_failures: u32,
    pub cause: Option<FailureCause>,
}

/// Tracks consecutive poll failures against the offline threshold.
///
/// Starts online: a coordinator that has not polled yet has no reason
/// to report the switch as down.
#[derive(Debug, Clone)]
pub struct HealthDetector {
    threshold: u32,
    state: ConnectivityState,
}

impl HealthDetector {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            state: ConnectivityState::default(),
        }
    }

    pub fn state(&self) -> &ConnectivityState {
        &self.state
    }

    pub fn record_success(&mut self, at: DateTime<Utc>, took: Duration) -> Option<Transition> {
        let from = self.state.health;
        let failures = self.state.consecutive_failures;

        self.state.health = Health::Online;
        self.state.consecutive_failures = 0;
        self.state.last_success = Some(at);
        self.state.last_poll_duration = Some(took);
        self.state.polls_total += 1;

        (from != Health::Online).then_some(Transition {
            from,
            to: Health::Online,
            consecutive_failures: failures,
            cause: None,
        })
    }

    pub fn record_failure(&mut self, cause: FailureCause, took: Duration) -> Option<Transition> {
        let from = self.state.health;

        self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
        self.state.last_failure = Some(cause);
        self.state.last_poll_duration = Some(took);
        self.state.polls_total += 1;
        self.state.polls_failed += 1;

        let to = if self.state.consecutive_failures >= self.threshold {
            Health::Offline
        } else {
            Health::Degraded
        };
        self.state.health = to;

        (from != to).then_some(Transition {
            from,
            to,
            consecutive_failures: self.state.consecutive_failures,
            cause: Some(cause),
        })
    }
}
