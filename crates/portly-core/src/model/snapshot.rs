// ── Switch snapshot ──

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::DeviceIdentity;
use super::poe::PoeStatus;
use super::port::{AdminState, Port, PortMode};

/// Whether every command of the poll produced usable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PollOutcome {
    #[default]
    Complete,
    /// Some commands timed out or could not be parsed; their fields are unknown.
    Partial { failed: Vec<String> },
}

/// What produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOrigin {
    FullPoll,
    /// A single-port refresh after a write, patched into the previous snapshot.
    PortRefresh { port: u16 },
}

/// Immutable, self-consistent view of the switch.
///
/// Every port `1..=port_count` has both a [`Port`] and a [`PoeStatus`]
/// entry. Consumers always see a whole snapshot, never a mix of two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Strictly increasing per cache.
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub identity: DeviceIdentity,
    pub ports: BTreeMap<u16, Port>,
    pub poe: BTreeMap<u16, PoeStatus>,
    pub outcome: PollOutcome,
    pub origin: SnapshotOrigin,
}

impl Snapshot {
    pub fn port(&self, index: u16) -> Option<&Port> {
        self.ports.get(&index)
    }

    pub fn poe(&self, index: u16) -> Option<&PoeStatus> {
        self.poe.get(&index)
    }

    /// Ports that are not excluded, in index order.
    pub fn visible_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values().filter(|p| !p.excluded)
    }

    /// Combined port/PoE mode, or `None` for an unknown port.
    pub fn port_mode(&self, index: u16) -> Option<PortMode> {
        let port = self.port(index)?;
        if port.admin != AdminState::Enabled {
            return Some(PortMode::Disabled);
        }
        let mode = match self.poe(index) {
            Some(poe) if poe.is_capable() => {
                if poe.admin == AdminState::Enabled {
                    PortMode::EnabledPoeOn
                } else {
                    PortMode::EnabledPoeOff
                }
            }
            _ => PortMode::Enabled,
        };
        Some(mode)
    }

    /// Total measured PoE draw across all ports.
    pub fn total_poe_draw_w(&self) -> f64 {
        self.poe.values().filter_map(|p| p.power_draw_w).sum()
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.outcome, PollOutcome::Partial { .. })
    }
}
