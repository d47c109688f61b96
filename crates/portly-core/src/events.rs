// ── Coordinator events ──
//
// Broadcast to every subscriber. Snapshots themselves travel through the
// cache's watch channel; events carry what a snapshot cannot: health
// transitions, parse failures and write results.

use chrono::{DateTime, Utc};
use portly_api::WriteOp;
use serde::Serialize;

use crate::health::Transition;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    HealthChanged {
        at: DateTime<Utc>,
        #[serde(flatten)]
        transition: Transition,
    },
    ParseFailed {
        at: DateTime<Utc>,
        command: String,
        reason: String,
        fragment: Option<String>,
    },
    WriteCompleted {
        at: DateTime<Utc>,
        port: u16,
        op: WriteOp,
        attempts: u32,
    },
    WriteFailed {
        at: DateTime<Utc>,
        port: u16,
        op: WriteOp,
        error: String,
    },
}

impl CoordinatorEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::HealthChanged { at, .. }
            | Self::ParseFailed { at, .. }
            | Self::WriteCompleted { at, .. }
            | Self::WriteFailed { at, .. } => *at,
        }
    }
}
