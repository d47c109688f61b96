// PoE dialect: `show power-over-ethernet all` / `show power-over-ethernet <n>`.
//
// Two layouts are understood: per-port detail blocks opened by
// "Status and Configuration Information for port N", and the brief
// table with one row per port.

use std::sync::LazyLock;

use regex::Regex;

use super::lines::{is_ruler, parse_flag, parse_measure, split_fields};
use super::{ParseError, ParseReport, ensure_not_empty};

const DIALECT: &str = "PoE status";

static POE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Status and Configuration Information for port (\d+)\s*$")
        .expect("static PoE header pattern")
});

/// Delivery state reported by the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoePortState {
    Delivering,
    Searching,
    Disabled,
    Fault,
    Denied,
    Other,
}

impl PoePortState {
    fn parse(value: &str) -> Option<Self> {
        let lower = value.to_ascii_lowercase();
        let state = if lower.contains("deliver") {
            Self::Delivering
        } else if lower.contains("search") {
            Self::Searching
        } else if lower.contains("disabled") || lower == "off" {
            Self::Disabled
        } else if lower.contains("fault") || lower.contains("overload") {
            Self::Fault
        } else if lower.contains("denied") || lower.contains("reject") {
            Self::Denied
        } else if lower.is_empty() {
            return None;
        } else {
            Self::Other
        };
        Some(state)
    }
}

/// PoE fields for one port.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoeRecord {
    pub port: u16,
    pub admin_enabled: Option<bool>,
    pub state: Option<PoePortState>,
    pub power_draw_w: Option<f64>,
    pub voltage_v: Option<f64>,
    pub current_ma: Option<f64>,
    pub power_class: Option<u8>,
    pub priority: Option<String>,
}

impl PoeRecord {
    fn apply(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        match key {
            "power enable" | "poe enable" | "power enabled" => self.admin_enabled = parse_flag(value),
            "poe port status" | "poe status" | "detection status" | "status" => {
                self.state = PoePortState::parse(value);
            }
            "power draw" | "power consumption" | "actual power" => {
                self.power_draw_w = parse_measure(value);
            }
            "voltage" => self.voltage_v = parse_measure(value),
            "current" => self.current_ma = parse_measure(value),
            "power class" => self.power_class = value.parse().ok(),
            // `PLC Class/Type : 4/2` carries the class before the slash.
            "plc class/type" if self.power_class.is_none() => {
                self.power_class = value.split('/').next().and_then(|c| c.trim().parse().ok());
            }
            "priority config" | "power priority" | "priority" => {
                self.priority = Some(value.to_ascii_lowercase());
            }
            _ => {}
        }
    }
}

/// Parse PoE output in either the detail-block or the table layout.
pub fn parse_poe(raw: &str) -> Result<ParseReport<PoeRecord>, ParseError> {
    ensure_not_empty(raw, DIALECT)?;
    if raw.lines().any(|l| POE_HEADER.is_match(l)) {
        parse_blocks(raw)
    } else {
        parse_table(raw)
    }
}

fn parse_blocks(raw: &str) -> Result<ParseReport<PoeRecord>, ParseError> {
    let mut report = ParseReport::new();
    let mut current: Option<PoeRecord> = None;

    for (idx, line) in raw.lines().enumerate() {
        if let Some(port) = POE_HEADER
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
        {
            if let Some(done) = current.replace(PoeRecord {
                port,
                ..PoeRecord::default()
            }) {
                report.records.push(done);
            }
            continue;
        }

        if line.trim().is_empty() || is_ruler(line) {
            continue;
        }
        let Some(record) = current.as_mut() else {
            report.skip(idx + 1, line, "outside any PoE section");
            continue;
        };
        let fields = split_fields(line);
        if fields.is_empty() {
            report.skip(idx + 1, line, "not a key/value line");
        }
        for (key, value) in fields {
            record.apply(&key, &value);
        }
    }

    if let Some(done) = current {
        report.records.push(done);
    }
    report.require_records(DIALECT)
}

/// Table layout:
///
/// ```text
///  Port  Power  Power    Alloc  Alloc   Actual Configured  Detection   Power
///        Enable Priority By     Power   Power  Type        Status      Class
///  ----- ------ -------- ------ ------- ------ ----------- ----------- -----
///  1     Yes    low      usage  17.0 W  4.8 W              Delivering  4
/// ```
///
/// Rows are read by content since the two-line header does not split
/// into columns and `Configured Type` is often blank.
fn parse_table(raw: &str) -> Result<ParseReport<PoeRecord>, ParseError> {
    let mut report = ParseReport::new();

    for (idx, line) in raw.lines().enumerate() {
        let cells: Vec<&str> = line.split_whitespace().collect();
        let Some(port) = cells.first().and_then(|c| c.parse::<u16>().ok()) else {
            continue;
        };

        let mut record = PoeRecord {
            port,
            admin_enabled: cells.get(1).and_then(|c| parse_flag(c)),
            priority: cells
                .get(2)
                .filter(|p| matches!(p.to_ascii_lowercase().as_str(), "low" | "high" | "critical"))
                .map(|p| p.to_ascii_lowercase()),
            ..PoeRecord::default()
        };

        // Wattages are `<number> W`; the last one is the actual draw.
        record.power_draw_w = cells
            .windows(2)
            .filter(|w| w[1].eq_ignore_ascii_case("w"))
            .filter_map(|w| parse_measure(w[0]))
            .last();
        record.state = cells.iter().skip(3).find_map(|c| {
            PoePortState::parse(c).filter(|s| *s != PoePortState::Other)
        });
        record.power_class = cells
            .last()
            .filter(|c| c.len() == 1)
            .and_then(|c| c.parse().ok());

        if record.admin_enabled.is_none() {
            report.skip(idx + 1, line, "unrecognized PoE row");
            continue;
        }
        report.records.push(record);
    }

    report.require_records(DIALECT)
}
