// Identity dialect: `show system`, with `show version` understood too.

use std::sync::LazyLock;

use regex::Regex;

use super::lines::split_fields;
use super::{ParseError, ParseReport, ensure_not_empty};

const DIALECT: &str = "identity";

/// ProCurve/ArubaOS firmware strings: `YA.16.08.0002`, `KB.16.10.0009`.
static FIRMWARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z]{1,2}\.\d{2}\.\d{2}\.\d{4})\b").expect("static firmware pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityRecord {
    pub model: Option<String>,
    /// Main firmware, or the ROM version when no main firmware is shown.
    pub firmware: Option<String>,
    pub rom_version: Option<String>,
    pub serial_number: Option<String>,
    pub uptime: Option<String>,
    pub hostname: Option<String>,
    pub base_mac: Option<String>,
}

impl IdentityRecord {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

/// Parse `show system` or `show version` output.
///
/// Fails only when not a single identity field could be found.
pub fn parse_identity(raw: &str) -> Result<ParseReport<IdentityRecord>, ParseError> {
    ensure_not_empty(raw, DIALECT)?;
    let mut report = ParseReport::new();
    let mut identity = IdentityRecord::default();

    for line in raw.lines() {
        for (key, value) in split_fields(line) {
            match key.as_str() {
                "software revision" | "software version" | "firmware version" => {
                    identity.firmware = FIRMWARE
                        .find(&value)
                        .map(|m| m.as_str().to_owned())
                        .or_else(|| non_empty(&value));
                }
                "rom version" | "boot rom version" => identity.rom_version = non_empty(&value),
                "serial number" | "serial" => identity.serial_number = non_empty(&value),
                "up time" | "uptime" => identity.uptime = non_empty(&value),
                "system name" | "hostname" => identity.hostname = non_empty(&value),
                "base mac addr" | "base mac address" | "mac address" => {
                    identity.base_mac = non_empty(&value);
                }
                "model" | "product name" | "system model" => identity.model = non_empty(&value),
                _ => {}
            }
        }
    }

    // `show version` prints the firmware on a bare line.
    if identity.firmware.is_none() {
        identity.firmware = raw
            .lines()
            .filter(|l| !l.to_ascii_lowercase().contains("rom"))
            .find_map(|l| FIRMWARE.find(l))
            .map(|m| m.as_str().to_owned());
    }
    if identity.firmware.is_none() {
        identity.firmware.clone_from(&identity.rom_version);
    }

    if identity.is_empty() {
        for (idx, line) in raw.lines().enumerate() {
            if !line.trim().is_empty() {
                report.skip(idx + 1, line, "no identity field");
            }
        }
    } else {
        report.records.push(identity);
    }
    report.require_records(DIALECT)
}

/// Model name from a CLI prompt such as `HP-2530-24G-PoEP#` or
/// `Aruba-2930F-48G(config)#`.
pub fn model_from_prompt(prompt: &str) -> Option<String> {
    let name = prompt
        .trim()
        .trim_end_matches(['#', '>'])
        .split('(')
        .next()?
        .trim();
    (!name.is_empty()).then(|| name.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn show_system_fields() {
        let raw = "
 Status and Counters - General System Information

  System Name        : core-sw-01
  System Contact     :
  System Location    :

  Software revision  : YA.16.08.0002        Base MAC Addr      : 001122-334455
  ROM Version        : YA.15.20            Serial Number      : CN12345678

  Up Time            : 23 days             Memory   - Total   : 152,455,616
";
        let identity = &parse_identity(raw).unwrap().records[0];
        assert_eq!(identity.hostname.as_deref(), Some("core-sw-01"));
        assert_eq!(identity.firmware.as_deref(), Some("YA.16.08.0002"));
        assert_eq!(identity.rom_version.as_deref(), Some("YA.15.20"));
        assert_eq!(identity.serial_number.as_deref(), Some("CN12345678"));
        assert_eq!(identity.uptime.as_deref(), Some("23 days"));
        assert_eq!(identity.base_mac.as_deref(), Some("001122-334455"));
    }

    #[test]
    fn show_version_bare_firmware_line() {
        let raw = "
Image stamp:    /ws/swbuildm/rel_ukiah_qaoff/code/build/bom(swbuildm_rel_ukiah_qaoff_rel_ukiah)
                Nov 12 2019 15:06:15
                YA.16.08.0002
                1223
Boot Image:     Primary
Boot ROM Version: YA.15.20
";
        let identity = &parse_identity(raw).unwrap().records[0];
        assert_eq!(identity.firmware.as_deref(), Some("YA.16.08.0002"));
        assert_eq!(identity.rom_version.as_deref(), Some("YA.15.20"));
    }

    #[test]
    fn rom_version_backs_up_missing_firmware() {
        let identity = &parse_identity("Boot ROM Version: KB.16.01\n").unwrap().records[0];
        assert_eq!(identity.firmware.as_deref(), Some("KB.16.01"));
    }

    #[test]
    fn prompt_yields_model() {
        assert_eq!(
            model_from_prompt("HP-2530-24G-PoEP#").as_deref(),
            Some("HP-2530-24G-PoEP")
        );
        assert_eq!(
            model_from_prompt("Aruba-2930F-48G(config)#").as_deref(),
            Some("Aruba-2930F-48G")
        );
        assert_eq!(model_from_prompt("#"), None);
    }
}
