// Interface brief dialect: `show interfaces brief`.
//
// The header row names the columns, so lookups go by name and survive
// reordered layouts. Without a header, fields are recognized by content.

use super::lines::{Duplex, is_ruler, parse_flag, speed_duplex};
use super::{ParseError, ParseReport, ensure_not_empty};

const DIALECT: &str = "interface brief";

/// One row of the status table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BriefRecord {
    pub port: u16,
    /// Media type such as `100/1000T` or `1000SX`.
    pub port_type: Option<String>,
    pub admin_enabled: Option<bool>,
    pub link_up: Option<bool>,
    pub speed_mbps: Option<u32>,
    pub duplex: Option<Duplex>,
    pub mdi_mode: Option<String>,
    pub flow_control: Option<bool>,
}

/// Column positions taken from the header row.
#[derive(Debug, Default)]
struct Columns {
    port: Option<usize>,
    port_type: Option<usize>,
    enabled: Option<usize>,
    status: Option<usize>,
    mode: Option<usize>,
    mdi: Option<usize>,
    flow: Option<usize>,
}

impl Columns {
    /// Recognize a header row: it names both `Port` and `Status`.
    fn from_header(line: &str) -> Option<Self> {
        let names = tokens(line);
        if !names.iter().any(|n| n.eq_ignore_ascii_case("port"))
            || !names.iter().any(|n| n.eq_ignore_ascii_case("status"))
        {
            return None;
        }

        let mut columns = Self::default();
        for (i, name) in names.iter().enumerate() {
            match name.to_ascii_lowercase().as_str() {
                "port" => columns.port = Some(i),
                "type" => columns.port_type = Some(i),
                "enabled" => columns.enabled = Some(i),
                "status" => columns.status = Some(i),
                // The first `Mode` is speed/duplex, the second the MDI mode.
                "mode" if columns.mode.is_none() => columns.mode = Some(i),
                "mode" => columns.mdi = Some(i),
                "ctrl" => columns.flow = Some(i),
                _ => {}
            }
        }
        columns.port.is_some().then_some(columns)
    }

    fn record(&self, cells: &[&str]) -> Option<BriefRecord> {
        let cell = |idx: Option<usize>| idx.and_then(|i| cells.get(i)).copied();
        let port = cell(self.port)?.parse().ok()?;
        let (speed_mbps, duplex) = cell(self.mode)
            .and_then(speed_duplex)
            .map_or((None, None), |(s, d)| (Some(s), d));

        Some(BriefRecord {
            port,
            port_type: cell(self.port_type).map(str::to_owned),
            admin_enabled: cell(self.enabled).and_then(parse_flag),
            link_up: cell(self.status).and_then(parse_flag),
            speed_mbps,
            duplex,
            mdi_mode: cell(self.mdi).filter(|m| *m != ".").map(str::to_owned),
            flow_control: cell(self.flow).and_then(parse_flag),
        })
    }
}

/// Whitespace tokens with the `|` separator column dropped.
fn tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().filter(|t| *t != "|").collect()
}

/// Content-based fallback for rows seen without a header.
fn guess_record(cells: &[&str]) -> Option<BriefRecord> {
    let port = cells.first()?.parse().ok()?;
    let mut record = BriefRecord {
        port,
        port_type: cells.get(1).map(|t| (*t).to_owned()),
        ..BriefRecord::default()
    };

    let status_at = cells
        .iter()
        .position(|c| c.eq_ignore_ascii_case("up") || c.eq_ignore_ascii_case("down"))?;
    record.link_up = parse_flag(cells[status_at]);
    // The enabled flag is the last yes/no before the status column.
    record.admin_enabled = cells[..status_at]
        .iter()
        .rev()
        .find_map(|c| match c.to_ascii_lowercase().as_str() {
            "yes" => Some(true),
            "no" => Some(false),
            _ => None,
        });

    for cell in &cells[status_at + 1..] {
        if record.speed_mbps.is_some() && record.mdi_mode.is_some() {
            break;
        }
        if let Some((speed, duplex)) = speed_duplex(cell).filter(|_| record.speed_mbps.is_none()) {
            record.speed_mbps = Some(speed);
            record.duplex = duplex;
        } else if cell.to_ascii_uppercase().starts_with("MDI") || cell.eq_ignore_ascii_case("auto") {
            record.mdi_mode = Some((*cell).to_owned());
        }
    }
    Some(record)
}

/// Parse the brief status table.
pub fn parse_brief(raw: &str) -> Result<ParseReport<BriefRecord>, ParseError> {
    ensure_not_empty(raw, DIALECT)?;
    let mut report = ParseReport::new();
    let mut columns: Option<Columns> = None;

    for (idx, line) in raw.lines().enumerate() {
        let number = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || is_ruler(line) {
            continue;
        }

        let cells = tokens(line);
        let starts_with_index = cells.first().is_some_and(|c| c.parse::<u16>().is_ok());

        if !starts_with_index {
            if let Some(found) = Columns::from_header(line) {
                columns = Some(found);
            }
            // Titles and the first header line carry no data.
            continue;
        }

        let record = match &columns {
            Some(columns) => columns.record(&cells),
            None => guess_record(&cells),
        };
        match record {
            Some(record) => report.records.push(record),
            None => report.skip(number, line, "unrecognized status row"),
        }
    }

    report.require_records(DIALECT)
}
