// ── Parser records → domain model ──
//
// Dispatches each command output to its dialect parser and merges the
// resulting records into one consistent set of ports. Parsing problems
// never abort the merge: a failed command leaves its fields unknown and
// is listed in the outcome.

use std::collections::BTreeMap;

use portly_api::parse::{
    self, BriefRecord, IdentityRecord, InterfaceRecord, ParseError, ParseReport, PoeRecord,
};
use portly_api::CommandOutput;
use tracing::debug;

use crate::config::CoordinatorConfig;
use crate::model::port::looks_like_sfp;
use crate::model::{
    AdminState, DeviceIdentity, Duplex, LinkState, PollOutcome, PoeStatus, Port, PortCounters,
};

/// A command whose output could not be turned into records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    pub command: String,
    pub reason: String,
    pub fragment: Option<String>,
}

/// Everything recovered from one batch of outputs.
///
/// `None` for a dialect means its command failed (timed out or
/// unparseable); `Some(vec![])` means it ran and reported nothing.
#[derive(Debug, Default)]
pub struct Readings {
    pub identity: Option<IdentityRecord>,
    pub prompt: Option<String>,
    pub brief: Option<Vec<BriefRecord>>,
    pub details: Option<Vec<InterfaceRecord>>,
    pub poe: Option<Vec<PoeRecord>>,
    /// Commands that timed out or failed to parse.
    pub failed: Vec<String>,
    pub issues: Vec<ParseIssue>,
}

/// The parts of a [`Snapshot`](crate::model::Snapshot) that come from the switch.
/// Sequence, timestamp and derived rates are filled in by the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotBody {
    pub identity: DeviceIdentity,
    pub ports: BTreeMap<u16, Port>,
    pub poe: BTreeMap<u16, PoeStatus>,
    pub outcome: PollOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Identity,
    Brief,
    Detail,
    Poe,
}

fn dialect_of(command: &str) -> Option<Dialect> {
    if command.starts_with("show system") {
        Some(Dialect::Identity)
    } else if command.starts_with("show interfaces brief") {
        Some(Dialect::Brief)
    } else if command.starts_with("show interfaces") {
        Some(Dialect::Detail)
    } else if command.starts_with("show power-over-ethernet") {
        Some(Dialect::Poe)
    } else {
        None
    }
}

/// Run every output through its parser.
pub fn read_outputs(outputs: &[CommandOutput]) -> Readings {
    let mut readings = Readings::default();

    for output in outputs {
        if readings.prompt.is_none() {
            readings.prompt.clone_from(&output.prompt);
        }
        let Some(dialect) = dialect_of(&output.command) else {
            continue;
        };
        if !output.is_complete() {
            debug!(command = %output.command, "command timed out, fields left unknown");
            readings.failed.push(output.command.clone());
            continue;
        }

        match dialect {
            Dialect::Identity => {
                readings.identity = collect(&mut readings, output, parse::parse_identity)
                    .and_then(|records| records.into_iter().next());
            }
            Dialect::Brief => readings.brief = collect(&mut readings, output, parse::parse_brief),
            Dialect::Detail => {
                readings.details = collect(&mut readings, output, parse::parse_interfaces);
            }
            Dialect::Poe => {
                // A switch without PoE refuses the command outright.
                if output.rejection().is_some() {
                    readings.poe = Some(Vec::new());
                } else {
                    readings.poe = collect(&mut readings, output, parse::parse_poe);
                }
            }
        }
    }
    readings
}

fn collect<T>(
    readings: &mut Readings,
    output: &CommandOutput,
    parser: fn(&str) -> Result<ParseReport<T>, ParseError>,
) -> Option<Vec<T>> {
    match parser(&output.text) {
        Ok(report) => {
            for diag in &report.diagnostics {
                debug!(
                    command = %output.command,
                    line = diag.line,
                    fragment = %diag.fragment,
                    reason = %diag.reason,
                    "skipped line"
                );
            }
            Some(report.records)
        }
        Err(e) => {
            readings.failed.push(output.command.clone());
            readings.issues.push(ParseIssue {
                command: output.command.clone(),
                reason: e.to_string(),
                fragment: e.fragment().map(str::to_owned),
            });
            None
        }
    }
}

// ── Merging ─────────────────────────────────────────────────────────

fn overlay_brief(port: &mut Port, brief: &BriefRecord) {
    if brief.admin_enabled.is_some() {
        port.admin = AdminState::from_flag(brief.admin_enabled);
    }
    if brief.link_up.is_some() {
        port.link = LinkState::from_flag(brief.link_up);
    }
    if brief.speed_mbps.is_some() {
        port.speed_mbps = brief.speed_mbps;
    }
    if brief.duplex.is_some() {
        port.duplex = Duplex::from(brief.duplex);
    }
    if brief.mdi_mode.is_some() {
        port.mdi_mode.clone_from(&brief.mdi_mode);
    }
    if brief.port_type.is_some() {
        port.port_type.clone_from(&brief.port_type);
    }
}

/// Detail output wins over the brief table for the fields both carry.
/// Counters are replaced as a whole.
fn overlay_detail(port: &mut Port, detail: &InterfaceRecord) {
    if detail.admin_enabled.is_some() {
        port.admin = AdminState::from_flag(detail.admin_enabled);
    }
    if detail.link_up.is_some() {
        port.link = LinkState::from_flag(detail.link_up);
    }
    if detail.speed_mbps.is_some() {
        port.speed_mbps = detail.speed_mbps;
    }
    if detail.duplex.is_some() {
        port.duplex = Duplex::from(detail.duplex);
    }
    if detail.auto_negotiation.is_some() {
        port.auto_negotiation = detail.auto_negotiation;
    }
    if detail.mdi_mode.is_some() {
        port.mdi_mode.clone_from(&detail.mdi_mode);
    }
    port.counters = PortCounters {
        bytes_in: detail.bytes_in,
        bytes_out: detail.bytes_out,
        packets_in: detail.packets_in,
        packets_out: detail.packets_out,
        errors_in: detail.errors_in,
        errors_out: detail.errors_out,
    };
    port.raw_hash = Some(detail.raw_hash);
}

fn finish_port(port: &mut Port, config: &CoordinatorConfig) {
    port.sfp = looks_like_sfp(port.index, port.speed_mbps, port.port_type.as_deref());
    port.excluded = config.excluded_ports.contains(&port.index);
}

fn poe_entry(index: u16, poe: Option<&[PoeRecord]>, config: &CoordinatorConfig) -> PoeStatus {
    let mut status = match poe {
        None => PoeStatus::unknown(index),
        Some(records) => records
            .iter()
            .find(|r| r.port == index)
            .map_or_else(|| PoeStatus::not_applicable(index), PoeStatus::from_record),
    };
    status.excluded = config.excluded_poe.contains(&index);
    status
}

fn identity_of(readings: &Readings) -> DeviceIdentity {
    let record = readings.identity.clone().unwrap_or_default();
    DeviceIdentity {
        model: record
            .model
            .or_else(|| readings.prompt.as_deref().and_then(parse::model_from_prompt)),
        firmware: record.firmware,
        rom_version: record.rom_version,
        serial_number: record.serial_number,
        uptime: record.uptime,
        hostname: record.hostname,
        base_mac: record.base_mac,
    }
}

/// Build the full port set `1..=port_count` from a poll's readings.
///
/// Returns `None` when neither interface command produced anything,
/// which counts as a failed poll. Records for ports beyond
/// `port_count` are ignored.
pub fn assemble(config: &CoordinatorConfig, readings: &Readings) -> Option<SnapshotBody> {
    if readings.brief.is_none() && readings.details.is_none() {
        return None;
    }

    let brief = readings.brief.as_deref().unwrap_or_default();
    let details = readings.details.as_deref().unwrap_or_default();

    let mut ports = BTreeMap::new();
    let mut poe = BTreeMap::new();
    for index in 1..=config.port_count {
        let mut port = Port::unknown(index);
        if let Some(b) = brief.iter().find(|b| b.port == index) {
            overlay_brief(&mut port, b);
        }
        if let Some(d) = details.iter().find(|d| d.port == index) {
            overlay_detail(&mut port, d);
        }
        finish_port(&mut port, config);
        ports.insert(index, port);
        poe.insert(index, poe_entry(index, readings.poe.as_deref(), config));
    }

    let outcome = if readings.failed.is_empty() {
        PollOutcome::Complete
    } else {
        PollOutcome::Partial {
            failed: readings.failed.clone(),
        }
    };

    Some(SnapshotBody {
        identity: identity_of(readings),
        ports,
        poe,
        outcome,
    })
}

/// Apply a single-port refresh on top of the port's previous state.
///
/// Returns `None` if the refresh produced no interface record for the port.
pub fn patch_port(
    config: &CoordinatorConfig,
    readings: &Readings,
    previous: &Port,
    previous_poe: &PoeStatus,
) -> Option<(Port, PoeStatus)> {
    let detail = readings
        .details
        .as_deref()?
        .iter()
        .find(|d| d.port == previous.index)?;

    let mut port = previous.clone();
    overlay_detail(&mut port, detail);
    finish_port(&mut port, config);

    let poe = match readings.poe.as_deref() {
        Some(records) => poe_entry(previous.index, Some(records), config),
        None => previous_poe.clone(),
    };
    Some((port, poe))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use portly_api::OutputStatus;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::PoeDelivery;

    fn output(command: &str, text: &str) -> CommandOutput {
        CommandOutput {
            command: command.into(),
            text: text.into(),
            prompt: Some("HP-2530-8G-PoEP#".into()),
            status: OutputStatus::Complete,
        }
    }

    fn config(ports: u16) -> CoordinatorConfig {
        CoordinatorConfig {
            port_count: ports,
            ..CoordinatorConfig::default()
        }
    }

    const BRIEF: &str = "\
  Port  Type      | Alert     Enabled Status Mode       Mode Ctrl  Limit
  ----- --------- + --------- ------- ------ ---------- ---- ----- ------
  1     100/1000T | No        Yes     Up     1000FDx    MDIX off   0
  2     100/1000T | No        No      Down   1000FDx    Auto off   0
";

    const POE: &str = "\
 Status and Configuration Information for port 1

  Power Enable      : Yes                   PoE Port Status   : Delivering
  Power Draw        : 0.0 W
";

    #[test]
    fn every_port_has_port_and_poe_entries() {
        let readings = read_outputs(&[
            output("show interfaces brief", BRIEF),
            output("show power-over-ethernet all", POE),
        ]);
        let body = assemble(&config(4), &readings).unwrap();

        assert_eq!(body.ports.len(), 4);
        assert_eq!(body.poe.len(), 4);
        assert_eq!(body.ports[&2].admin, AdminState::Disabled);
        assert_eq!(body.ports[&3].link, LinkState::Unknown);
        assert_eq!(body.poe[&2].delivery, PoeDelivery::NotApplicable);
        // Status says delivering, the meter says nothing flows.
        assert!(!body.poe[&1].delivering());
        assert_eq!(body.poe[&1].delivery, PoeDelivery::Searching);
        assert_eq!(body.outcome, PollOutcome::Complete);
    }

    #[test]
    fn rejected_poe_command_means_no_poe_hardware() {
        let readings = read_outputs(&[
            output("show interfaces brief", BRIEF),
            output("show power-over-ethernet all", "Invalid input: power-over-ethernet"),
        ]);
        assert!(readings.failed.is_empty());
        let body = assemble(&config(2), &readings).unwrap();
        assert_eq!(body.poe[&1].delivery, PoeDelivery::NotApplicable);
    }

    #[test]
    fn timed_out_command_makes_a_partial_poll() {
        let mut poe = output("show power-over-ethernet all", "");
        poe.status = OutputStatus::TimedOut;
        let readings = read_outputs(&[output("show interfaces brief", BRIEF), poe]);

        let body = assemble(&config(2), &readings).unwrap();
        assert_eq!(
            body.outcome,
            PollOutcome::Partial {
                failed: vec!["show power-over-ethernet all".into()]
            }
        );
        assert_eq!(body.poe[&1].delivery, PoeDelivery::Unknown);
    }

    #[test]
    fn no_interface_data_is_not_a_snapshot() {
        let readings = read_outputs(&[output("show interfaces all", "Invalid input: all")]);
        assert_eq!(readings.issues.len(), 1);
        assert_eq!(readings.issues[0].fragment.as_deref(), Some("Invalid input: all"));
        assert!(assemble(&config(2), &readings).is_none());
    }

    #[test]
    fn model_falls_back_to_prompt() {
        let readings = read_outputs(&[
            output("show system", "  System Name        : lab-sw\n"),
            output("show interfaces brief", BRIEF),
        ]);
        let body = assemble(&config(2), &readings).unwrap();
        assert_eq!(body.identity.hostname.as_deref(), Some("lab-sw"));
        assert_eq!(body.identity.model.as_deref(), Some("HP-2530-8G-PoEP"));
    }

    #[test]
    fn excluded_ports_stay_in_the_model() {
        let mut cfg = config(2);
        cfg.excluded_ports.insert(2);
        let readings = read_outputs(&[output("show interfaces brief", BRIEF)]);
        let body = assemble(&cfg, &readings).unwrap();
        assert!(body.ports[&2].excluded);
        assert!(!body.ports[&1].excluded);
    }
}
