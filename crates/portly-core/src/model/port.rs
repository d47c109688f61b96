// ── Port domain types ──

use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdminState {
    Enabled,
    Disabled,
    #[default]
    Unknown,
}

impl AdminState {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Self::Enabled,
            Some(false) => Self::Disabled,
            None => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LinkState {
    Up,
    Down,
    #[default]
    Unknown,
}

impl LinkState {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Self::Up,
            Some(false) => Self::Down,
            None => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Duplex {
    Full,
    Half,
    #[default]
    Unknown,
}

impl From<Option<portly_api::parse::Duplex>> for Duplex {
    fn from(d: Option<portly_api::parse::Duplex>) -> Self {
        match d {
            Some(portly_api::parse::Duplex::Full) => Self::Full,
            Some(portly_api::parse::Duplex::Half) => Self::Half,
            None => Self::Unknown,
        }
    }
}

/// Combined port and PoE state, as an operator would describe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PortMode {
    Disabled,
    /// Enabled on a port without PoE.
    Enabled,
    EnabledPoeOn,
    EnabledPoeOff,
}

/// Raw monotonic counters since boot or last clear.
///
/// `None` when the switch did not report the counter this poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortCounters {
    pub bytes_in: Option<u64>,
    pub bytes_out: Option<u64>,
    pub packets_in: Option<u64>,
    pub packets_out: Option<u64>,
    pub errors_in: Option<u64>,
    pub errors_out: Option<u64>,
}

/// A per-second rate derived from two consecutive readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Rate {
    /// No previous reading, or no time elapsed between the two.
    #[default]
    Unknown,
    /// The counter went backwards (clear or reboot).
    Reset,
    PerSecond(f64),
}

impl Rate {
    /// Rate between two readings taken `elapsed_secs` apart.
    pub fn between(previous: Option<u64>, current: Option<u64>, elapsed_secs: f64) -> Self {
        match (previous, current) {
            (Some(prev), Some(cur)) if elapsed_secs > 0.0 => {
                if cur < prev {
                    Self::Reset
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    Self::PerSecond((cur - prev) as f64 / elapsed_secs)
                }
            }
            _ => Self::Unknown,
        }
    }

    pub fn per_second(self) -> Option<f64> {
        match self {
            Self::PerSecond(v) => Some(v),
            Self::Unknown | Self::Reset => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortRates {
    pub bytes_in: Rate,
    pub bytes_out: Rate,
    pub packets_in: Rate,
    pub packets_out: Rate,
}

/// One front-panel port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// 1-based port index.
    pub index: u16,
    pub admin: AdminState,
    pub link: LinkState,
    pub speed_mbps: Option<u32>,
    pub duplex: Duplex,
    pub auto_negotiation: Option<bool>,
    pub mdi_mode: Option<String>,
    /// Media type such as `100/1000T` or `1000SX`.
    pub port_type: Option<String>,
    pub counters: PortCounters,
    pub rates: PortRates,
    /// Traffic above the activity threshold since the previous reading.
    pub active: Option<bool>,
    /// Likely an uplink/SFP slot rather than a copper access port.
    pub sfp: bool,
    /// Hidden from consumers and writes, still polled.
    pub excluded: bool,
    /// Hash of the raw interface section, for change detection.
    #[serde(skip)]
    pub raw_hash: Option<u64>,
}

impl Port {
    pub fn unknown(index: u16) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.admin == AdminState::Enabled
    }

    /// Fill derived rates and activity from the previous reading of
    /// the same port.
    pub fn derive_from(&mut self, previous: Option<&Port>, elapsed_secs: f64, threshold: u64) {
        let Some(prev) = previous else {
            self.rates = PortRates::default();
            self.active = None;
            return;
        };
        let (p, c) = (&prev.counters, &self.counters);
        self.rates = PortRates {
            bytes_in: Rate::between(p.bytes_in, c.bytes_in, elapsed_secs),
            bytes_out: Rate::between(p.bytes_out, c.bytes_out, elapsed_secs),
            packets_in: Rate::between(p.packets_in, c.packets_in, elapsed_secs),
            packets_out: Rate::between(p.packets_out, c.packets_out, elapsed_secs),
        };

        let delta = |prev: Option<u64>, cur: Option<u64>| match (prev, cur) {
            (Some(p), Some(c)) => c.checked_sub(p),
            _ => None,
        };
        self.active = match (
            delta(p.bytes_in, c.bytes_in),
            delta(p.bytes_out, c.bytes_out),
        ) {
            (Some(rx), Some(tx)) => Some(rx.saturating_add(tx) > threshold),
            _ => None,
        };
    }
}

/// Heuristic: uplink/SFP ports sit above 24 or run gigabit on non-copper media.
pub fn looks_like_sfp(index: u16, speed_mbps: Option<u32>, port_type: Option<&str>) -> bool {
    let non_copper = port_type.is_some_and(|t| !t.trim_end().ends_with('T'));
    index > 24 || (speed_mbps.is_some_and(|s| s >= 1000) && non_copper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_bytes(rx: u64, tx: u64) -> Port {
        Port {
            index: 1,
            counters: PortCounters {
                bytes_in: Some(rx),
                bytes_out: Some(tx),
                ..PortCounters::default()
            },
            ..Port::default()
        }
    }

    #[test]
    fn counter_decrease_is_a_reset_not_a_negative_rate() {
        let prev = with_bytes(5_000, 5_000);
        let mut cur = with_bytes(100, 6_000);
        cur.derive_from(Some(&prev), 10.0, 1000);
        assert_eq!(cur.rates.bytes_in, Rate::Reset);
        assert_eq!(cur.rates.bytes_out, Rate::PerSecond(100.0));
        assert_eq!(cur.active, None);
    }

    #[test]
    fn no_previous_reading_means_unknown() {
        let mut cur = with_bytes(100, 100);
        cur.derive_from(None, 10.0, 1000);
        assert_eq!(cur.rates.bytes_in, Rate::Unknown);
        assert_eq!(cur.active, None);
    }

    #[test]
    fn zero_elapsed_is_unknown() {
        assert_eq!(Rate::between(Some(1), Some(2), 0.0), Rate::Unknown);
    }

    #[test]
    fn activity_uses_threshold() {
        let prev = with_bytes(0, 0);
        let mut quiet = with_bytes(400, 400);
        quiet.derive_from(Some(&prev), 30.0, 1000);
        assert_eq!(quiet.active, Some(false));

        let mut busy = with_bytes(800, 400);
        busy.derive_from(Some(&prev), 30.0, 1000);
        assert_eq!(busy.active, Some(true));
    }

    #[test]
    fn sfp_heuristic() {
        assert!(looks_like_sfp(25, None, None));
        assert!(looks_like_sfp(3, Some(1000), Some("1000SX")));
        assert!(!looks_like_sfp(3, Some(1000), Some("100/1000T")));
        assert!(!looks_like_sfp(3, None, None));
    }
}
