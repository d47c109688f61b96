// Small line matchers shared by the dialect parsers.

use std::sync::LazyLock;

use regex::Regex;

static INTERFACE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Interface (\d+)\s*$").expect("static header pattern"));

static PROCURVE_COUNTERS_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Status and Counters - Port Counters for port (\d+)\s*$")
        .expect("static header pattern")
});

static SPEED_DUPLEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(G|Gig)?(FDx|HDx|FD|HD|Full|Half)?$").expect("static speed pattern")
});

static COUNTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(,\d{3})+$|^\d+$").expect("static counter pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Duplex {
    Full,
    Half,
}

/// Traffic direction named by a counter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// Port index if `line` opens an interface section.
///
/// Only two shapes qualify: exactly `Interface <n>` starting at column
/// zero, or the whole ProCurve counters header. Lines that merely
/// mention a port ("Port Enabled : Yes", "port 3 enabled") never match.
pub fn interface_header(line: &str) -> Option<u16> {
    INTERFACE_HEADER
        .captures(line)
        .or_else(|| PROCURVE_COUNTERS_HEADER.captures(line))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Lowercase a key and collapse its inner whitespace.
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Split a line into `(key, value)` pairs.
///
/// Handles the two-column layout where one line carries two pairs
/// separated by a wide gap (`Bytes Rx : 1,234      Bytes Tx : 5,678`)
/// as well as single pairs. Keys come back normalized; values trimmed.
pub fn split_fields(line: &str) -> Vec<(String, String)> {
    let segments: Vec<&str> = line
        .split("  ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut pending = String::new();

    for segment in &segments {
        if let Some(value) = segment.strip_prefix(':') {
            pairs.push((normalize_key(&pending), value.trim().to_owned()));
            pending.clear();
        } else if let Some((key, value)) = segment.split_once(':') {
            let key = join(&pending, key);
            pairs.push((normalize_key(&key), value.trim().to_owned()));
            pending.clear();
        } else {
            pending = join(&pending, segment);
        }
    }

    // A trailing bare segment is the value of an open `Key :` pair.
    if !pending.is_empty() {
        if let Some((_, value)) = pairs.last_mut().filter(|pair| pair.1.is_empty()) {
            *value = pending;
        }
    }

    pairs
}

fn join(head: &str, tail: &str) -> String {
    let tail = tail.trim();
    if head.is_empty() {
        tail.to_owned()
    } else if tail.is_empty() {
        head.to_owned()
    } else {
        format!("{head} {tail}")
    }
}

/// Parse a counter that may use comma thousands separators.
pub fn parse_counter(value: &str) -> Option<u64> {
    let token = value.split_whitespace().next()?;
    if !COUNTER.is_match(token) {
        return None;
    }
    token.replace(',', "").parse().ok()
}

/// Leading decimal number of a value such as `4.8 W` or `87 mA`.
pub fn parse_measure(value: &str) -> Option<f64> {
    let token = value.split_whitespace().next()?;
    let digits: String = token
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Interpret yes/no style values.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.split_whitespace().next()?.to_ascii_lowercase().as_str() {
        "yes" | "enabled" | "enable" | "on" | "up" | "true" | "active" => Some(true),
        "no" | "disabled" | "disable" | "off" | "down" | "false" | "inactive" => Some(false),
        _ => None,
    }
}

/// Direction implied by a counter key (`bytes rx`, `packets out`, ...).
pub fn direction(key: &str) -> Option<Direction> {
    key.split_whitespace().find_map(|word| match word {
        "rx" | "in" | "input" | "received" => Some(Direction::In),
        "tx" | "out" | "output" | "transmitted" | "sent" => Some(Direction::Out),
        _ => None,
    })
}

/// Decode a brief-table mode such as `1000FDx`, `100HDx` or `10GFD`.
///
/// `.` and `Auto` (no link) decode to `None`.
pub fn speed_duplex(token: &str) -> Option<(u32, Option<Duplex>)> {
    let caps = SPEED_DUPLEX.captures(token.trim())?;
    let mut speed: u32 = caps.get(1)?.as_str().parse().ok()?;
    if caps.get(2).is_some() {
        speed = speed.checked_mul(1000)?;
    }
    let duplex = caps.get(3).map(|m| {
        if m.as_str().starts_with('F') {
            Duplex::Full
        } else {
            Duplex::Half
        }
    });
    Some((speed, duplex))
}

/// Parse a free-form speed value such as `1000 Mbps` or `10 Gbps`.
pub fn parse_speed(value: &str) -> Option<u32> {
    let lower = value.to_ascii_lowercase();
    let number: u32 = lower
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())?
        .parse()
        .ok()?;
    if lower.contains("gb") || lower.contains("gig") {
        number.checked_mul(1000)
    } else {
        Some(number)
    }
}

pub fn parse_duplex(value: &str) -> Option<Duplex> {
    let lower = value.to_ascii_lowercase();
    if lower.contains("full") {
        Some(Duplex::Full)
    } else if lower.contains("half") {
        Some(Duplex::Half)
    } else {
        None
    }
}

/// True for table rulers like `----- ------- +------`.
pub fn is_ruler(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| matches!(c, '-' | '+' | '|' | ' '))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pairs(line: &str) -> Vec<(String, String)> {
        split_fields(line)
    }

    #[test]
    fn header_requires_structural_anchor() {
        assert_eq!(interface_header("Interface 3"), Some(3));
        assert_eq!(
            interface_header(" Status and Counters - Port Counters for port 17"),
            Some(17)
        );
        assert_eq!(interface_header("  Interface 3"), None);
        assert_eq!(interface_header("Port Enabled : Yes"), None);
        assert_eq!(interface_header("port 3 enabled"), None);
        assert_eq!(interface_header("Interface 3 is enabled"), None);
    }

    #[test]
    fn combined_pairs_split_on_wide_gap() {
        assert_eq!(
            pairs("   Bytes Rx        : 172,860,154          Bytes Tx        : 144,042,561"),
            vec![
                ("bytes rx".to_owned(), "172,860,154".to_owned()),
                ("bytes tx".to_owned(), "144,042,561".to_owned()),
            ]
        );
    }

    #[test]
    fn key_with_unit_suffix_is_joined() {
        assert_eq!(
            pairs("   Total Rx  (bps) : 3,456"),
            vec![("total rx (bps)".to_owned(), "3,456".to_owned())]
        );
    }

    #[test]
    fn empty_value_and_single_spaced_pair() {
        assert_eq!(
            pairs("  Name  :"),
            vec![("name".to_owned(), String::new())]
        );
        assert_eq!(
            pairs("Power Draw : 4.8 W"),
            vec![("power draw".to_owned(), "4.8 W".to_owned())]
        );
    }

    #[test]
    fn counters_accept_thousands_separators() {
        assert_eq!(parse_counter("172,860,154"), Some(172_860_154));
        assert_eq!(parse_counter("0"), Some(0));
        assert_eq!(parse_counter("12,34"), None);
        assert_eq!(parse_counter("n/a"), None);
    }

    #[test]
    fn brief_modes_decode() {
        assert_eq!(speed_duplex("1000FDx"), Some((1000, Some(Duplex::Full))));
        assert_eq!(speed_duplex("100HDx"), Some((100, Some(Duplex::Half))));
        assert_eq!(speed_duplex("10GigFD"), Some((10_000, Some(Duplex::Full))));
        assert_eq!(speed_duplex("."), None);
    }

    #[test]
    fn measures_and_flags() {
        assert_eq!(parse_measure("4.8 W"), Some(4.8));
        assert_eq!(parse_measure("87 mA"), Some(87.0));
        assert_eq!(parse_measure("n/a"), None);
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag("Disabled"), Some(false));
        assert_eq!(parse_flag("Searching"), None);
        assert_eq!(parse_speed("1 Gbps"), Some(1000));
        assert_eq!(direction("total rx errors"), Some(Direction::In));
        assert_eq!(direction("drops tx"), Some(Direction::Out));
    }
}
