// ── Command queue API ──
//
// Every port/PoE write flows through a single queue. The coordinator's
// command processor drains it one command at a time, so writes never
// interleave on the device session.

mod retry;

use chrono::{DateTime, Utc};
use portly_api::WriteOp;
use serde::Serialize;

use crate::error::CoreError;

pub use retry::RetryPolicy;

/// A write waiting for, or undergoing, execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingCommand {
    pub port: u16,
    pub op: WriteOp,
    pub submitted_at: DateTime<Utc>,
    /// Retries spent so far.
    pub retries: u32,
}

impl PendingCommand {
    pub fn new(port: u16, op: WriteOp) -> Self {
        Self {
            port,
            op,
            submitted_at: Utc::now(),
            retries: 0,
        }
    }
}

/// Result of a completed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub port: u16,
    pub op: WriteOp,
    /// Attempts it took, including the successful one.
    pub attempts: u32,
    /// The follow-up single-port refresh made it into the cache.
    pub refreshed: bool,
}

/// A command envelope sent through the command channel.
/// Contains the command, the instant its caller stops waiting and a
/// oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: PendingCommand,
    pub deadline: tokio::time::Instant,
    pub response_tx: tokio::sync::oneshot::Sender<Result<WriteOutcome, CoreError>>,
}

impl CommandEnvelope {
    /// The caller has gone away or its deadline has passed.
    pub fn is_abandoned(&self) -> bool {
        self.response_tx.is_closed() || tokio::time::Instant::now() >= self.deadline
    }

    /// Resolves once the caller stops waiting.
    pub async fn abandoned(&mut self) {
        let deadline = self.deadline;
        tokio::select! {
            () = self.response_tx.closed() => {}
            () = tokio::time::sleep_until(deadline) => {}
        }
    }
}
