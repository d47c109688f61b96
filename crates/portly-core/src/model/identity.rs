// ── Device identity ──

use serde::{Deserialize, Serialize};

/// What the switch says about itself. Every field is optional since
/// models and firmware trains disagree on what `show system` prints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Model name, from `show system` or else the CLI prompt.
    pub model: Option<String>,
    pub firmware: Option<String>,
    pub rom_version: Option<String>,
    pub serial_number: Option<String>,
    pub uptime: Option<String>,
    pub hostname: Option<String>,
    pub base_mac: Option<String>,
}
