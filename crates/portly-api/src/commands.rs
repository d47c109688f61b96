// CLI command set understood by the coordinator.
//
// Read commands map onto the parser dialects; write operations expand
// into the full configure / interface / exit / write memory sequence.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A read-only `show` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadCommand {
    /// `show interfaces all`: per-port counter blocks.
    InterfaceDetail,
    /// `show interfaces brief`: one status row per port.
    InterfaceBrief,
    /// `show power-over-ethernet all`: per-port PoE blocks.
    PoeStatus,
    /// `show system`: identity and uptime.
    Identity,
    /// `show interfaces <n>`.
    InterfaceDetailFor(u16),
    /// `show power-over-ethernet <n>`.
    PoeStatusFor(u16),
}

impl ReadCommand {
    /// Commands of one full poll, in execution order.
    pub const FULL_POLL: [Self; 4] = [
        Self::Identity,
        Self::InterfaceBrief,
        Self::InterfaceDetail,
        Self::PoeStatus,
    ];

    pub fn cli(&self) -> String {
        match self {
            Self::InterfaceDetail => "show interfaces all".into(),
            Self::InterfaceBrief => "show interfaces brief".into(),
            Self::PoeStatus => "show power-over-ethernet all".into(),
            Self::Identity => "show system".into(),
            Self::InterfaceDetailFor(port) => format!("show interfaces {port}"),
            Self::PoeStatusFor(port) => format!("show power-over-ethernet {port}"),
        }
    }

    /// Commands that re-read a single port after a write.
    pub fn port_refresh(port: u16) -> [Self; 2] {
        [Self::InterfaceDetailFor(port), Self::PoeStatusFor(port)]
    }
}

/// Configuration change applied to one port.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WriteOp {
    EnablePort,
    DisablePort,
    EnablePoe,
    DisablePoe,
}

impl WriteOp {
    pub fn port(enabled: bool) -> Self {
        if enabled { Self::EnablePort } else { Self::DisablePort }
    }

    pub fn poe(enabled: bool) -> Self {
        if enabled { Self::EnablePoe } else { Self::DisablePoe }
    }

    fn action(self) -> &'static str {
        match self {
            Self::EnablePort => "enable",
            Self::DisablePort => "disable",
            Self::EnablePoe => "power-over-ethernet",
            Self::DisablePoe => "no power-over-ethernet",
        }
    }

    /// Full CLI sequence for this operation on `port`, ending back at
    /// the manager prompt with the change saved.
    pub fn sequence(self, port: u16) -> Vec<String> {
        vec![
            "configure".into(),
            format!("interface {port}"),
            self.action().into(),
            "exit".into(),
            "write memory".into(),
            "exit".into(),
        ]
    }
}
