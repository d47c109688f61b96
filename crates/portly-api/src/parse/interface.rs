// Interface detail dialect: `show interfaces all` / `show interfaces <n>`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::lines::{
    self, Direction, Duplex, interface_header, is_ruler, parse_counter, parse_duplex, parse_flag,
    parse_speed, split_fields,
};
use super::{ParseError, ParseReport, ensure_not_empty};

const DIALECT: &str = "interface detail";

/// One interface section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceRecord {
    pub port: u16,
    pub admin_enabled: Option<bool>,
    pub link_up: Option<bool>,
    pub speed_mbps: Option<u32>,
    pub duplex: Option<Duplex>,
    pub auto_negotiation: Option<bool>,
    pub mdi_mode: Option<String>,
    pub bytes_in: Option<u64>,
    pub bytes_out: Option<u64>,
    /// Unicast plus broadcast/multicast, when the switch splits them.
    pub packets_in: Option<u64>,
    pub packets_out: Option<u64>,
    pub errors_in: Option<u64>,
    pub errors_out: Option<u64>,
    /// Hash of the section's trimmed lines.
    pub raw_hash: u64,
}

struct Section {
    record: InterfaceRecord,
    hasher: DefaultHasher,
}

impl Section {
    fn new(port: u16) -> Self {
        let mut hasher = DefaultHasher::new();
        port.hash(&mut hasher);
        Self {
            record: InterfaceRecord {
                port,
                ..InterfaceRecord::default()
            },
            hasher,
        }
    }

    fn finish(mut self) -> InterfaceRecord {
        self.record.raw_hash = self.hasher.finish();
        self.record
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        if value.is_empty() {
            return Ok(());
        }
        let r = &mut self.record;
        match key {
            "link status" | "link state" | "link" => r.link_up = parse_flag(value),
            "port enabled" | "enabled" | "admin status" | "admin state" | "administrative state" => {
                r.admin_enabled = parse_flag(value);
            }
            "duplex" => r.duplex = parse_duplex(value),
            "mdi mode" | "mdi" | "cable mode" => {
                r.mdi_mode = Some(value.to_owned()).filter(|v| !v.is_empty());
            }
            k if k.contains("auto") && k.contains("neg") => r.auto_negotiation = parse_flag(value),
            // Rate and utilization lines look like counters but are not.
            k if k.contains("bps)") || k.contains("util") || k.contains("rate") => {}
            k if k.contains("speed") => r.speed_mbps = parse_speed(value),
            k if k.contains("rx/tx") || k.contains("in/out") => {
                let (rx, tx) = counter_pair(value).ok_or("expected two counters")?;
                if k.contains("byte") || k.contains("octet") {
                    r.bytes_in = Some(rx);
                    r.bytes_out = Some(tx);
                } else if k.contains("error") {
                    r.errors_in = Some(rx);
                    r.errors_out = Some(tx);
                } else {
                    add(&mut r.packets_in, rx);
                    add(&mut r.packets_out, tx);
                }
            }
            k if k.contains("byte") || k.contains("octet") => {
                let n = counter(value)?;
                match lines::direction(k) {
                    Some(Direction::In) => r.bytes_in = Some(n),
                    Some(Direction::Out) => r.bytes_out = Some(n),
                    None => {}
                }
            }
            k if k.contains("unicast")
                || k.contains("bcast")
                || k.contains("mcast")
                || k.contains("broadcast")
                || k.contains("multicast")
                || k.starts_with("packets") =>
            {
                let n = counter(value)?;
                match lines::direction(k) {
                    Some(Direction::In) => add(&mut r.packets_in, n),
                    Some(Direction::Out) => add(&mut r.packets_out, n),
                    None => {}
                }
            }
            k if k.contains("error") => {
                let n = counter(value)?;
                match lines::direction(k) {
                    Some(Direction::In) => r.errors_in = Some(n),
                    Some(Direction::Out) => r.errors_out = Some(n),
                    None => {}
                }
            }
            k if k.contains("drop") && lines::direction(k) == Some(Direction::Out) => {
                let n = counter(value)?;
                r.errors_out.get_or_insert(n);
            }
            _ => {}
        }
        Ok(())
    }
}

fn counter(value: &str) -> Result<u64, String> {
    parse_counter(value).ok_or_else(|| format!("unreadable counter '{value}'"))
}

fn counter_pair(value: &str) -> Option<(u64, u64)> {
    let mut parts = value
        .split(|c: char| c == '/' || c.is_whitespace())
        .filter(|s| !s.is_empty());
    Some((parse_counter(parts.next()?)?, parse_counter(parts.next()?)?))
}

fn add(slot: &mut Option<u64>, n: u64) {
    *slot = Some(slot.unwrap_or(0).saturating_add(n));
}

/// Parse interface detail output into one record per section.
///
/// A section opens only at a strict interface header (see
/// [`interface_header`]). Unknown keys are ignored; lines outside any
/// section and unreadable counters are reported as diagnostics.
pub fn parse_interfaces(raw: &str) -> Result<ParseReport<InterfaceRecord>, ParseError> {
    ensure_not_empty(raw, DIALECT)?;
    let mut report = ParseReport::new();
    let mut current: Option<Section> = None;

    for (idx, line) in raw.lines().enumerate() {
        let number = idx + 1;

        if let Some(port) = interface_header(line) {
            if let Some(section) = current.replace(Section::new(port)) {
                report.records.push(section.finish());
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || is_ruler(line) {
            continue;
        }

        let Some(section) = current.as_mut() else {
            report.skip(number, line, "outside any interface section");
            continue;
        };
        trimmed.hash(&mut section.hasher);

        let fields = split_fields(line);
        if fields.is_empty() {
            report.skip(number, line, "not a key/value line");
            continue;
        }
        for (key, value) in fields {
            if let Err(reason) = section.apply(&key, &value) {
                report.skip(number, line, reason);
            }
        }
    }

    if let Some(section) = current {
        report.records.push(section.finish());
    }
    report.require_records(DIALECT)
}
