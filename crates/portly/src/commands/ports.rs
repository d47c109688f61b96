//! Port command handlers.

use tabled::Tabled;

use portly_core::{Coordinator, PortMode, PortView};

use crate::cli::{GlobalOpts, PortsArgs, PortsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Port")]
    index: u16,
    #[tabled(rename = "Admin")]
    admin: String,
    #[tabled(rename = "Link")]
    link: String,
    #[tabled(rename = "Speed")]
    speed: String,
    #[tabled(rename = "Duplex")]
    duplex: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "In")]
    rate_in: String,
    #[tabled(rename = "Out")]
    rate_out: String,
    #[tabled(rename = "Errors")]
    errors: String,
    #[tabled(rename = "Active")]
    active: String,
}

fn speed(view: &PortView) -> String {
    match view.port.speed_mbps {
        Some(mbps) if mbps >= 1000 && mbps % 1000 == 0 => format!("{}G", mbps / 1000),
        Some(mbps) => format!("{mbps}M"),
        None => "-".into(),
    }
}

fn errors(view: &PortView) -> String {
    let c = &view.port.counters;
    match (c.errors_in, c.errors_out) {
        (None, None) => "-".into(),
        (i, o) => (i.unwrap_or(0).saturating_add(o.unwrap_or(0))).to_string(),
    }
}

fn yes_no(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes".into(),
        Some(false) => "no".into(),
        None => "-".into(),
    }
}

fn row(view: &PortView, color: bool) -> PortRow {
    let p = &view.port;
    PortRow {
        index: p.index,
        admin: p.admin.to_string(),
        link: output::paint_link(p.link, color),
        speed: speed(view),
        duplex: p.duplex.to_string(),
        mode: view.mode.to_string(),
        rate_in: output::byte_rate(p.rates.bytes_in.per_second()),
        rate_out: output::byte_rate(p.rates.bytes_out.per_second()),
        errors: errors(view),
        active: yes_no(p.active),
    }
}

fn detail(view: &PortView, color: bool) -> String {
    let p = &view.port;
    let c = &p.counters;
    let count = |v: Option<u64>| v.map_or_else(|| "-".into(), |n| n.to_string());
    let mut lines = vec![
        format!("Port:        {}", p.index),
        format!("Type:        {}", p.port_type.as_deref().unwrap_or("-")),
        format!("Admin:       {}", p.admin),
        format!("Link:        {}", output::paint_link(p.link, color)),
        format!("Speed:       {}", speed(view)),
        format!("Duplex:      {}", p.duplex),
        format!("Auto-neg:    {}", yes_no(p.auto_negotiation)),
        format!("MDI:         {}", p.mdi_mode.as_deref().unwrap_or("-")),
        format!("Mode:        {}", view.mode),
        format!("Bytes:       {} in / {} out", count(c.bytes_in), count(c.bytes_out)),
        format!(
            "Packets:     {} in / {} out",
            count(c.packets_in),
            count(c.packets_out)
        ),
        format!("Errors:      {} in / {} out", count(c.errors_in), count(c.errors_out)),
        format!(
            "Rate:        {} in / {} out",
            output::byte_rate(p.rates.bytes_in.per_second()),
            output::byte_rate(p.rates.bytes_out.per_second())
        ),
        format!("Active:      {}", yes_no(p.active)),
    ];
    if p.sfp {
        lines.push("Media:       SFP uplink".into());
    }
    if view.poe.is_capable() {
        lines.push(format!(
            "PoE:         {} ({}, {})",
            output::paint_delivery(view.poe.delivery, color),
            view.poe.admin,
            output::watts(view.poe.power_draw_w)
        ));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    coordinator: &Coordinator,
    args: PortsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        PortsCommand::List => {
            util::fresh_snapshot(coordinator).await?;
            let ports = coordinator.list_ports()?;
            let out = output::render_list(
                &global.output,
                &ports,
                |v| row(v, color),
                |v| format!("{} {} {}", v.port.index, v.port.link, v.mode),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PortsCommand::Get(arg) => {
            util::fresh_snapshot(coordinator).await?;
            let view = coordinator.get_port(arg.port)?;
            let out = output::render_single(
                &global.output,
                &view,
                |v| detail(v, color),
                |v| format!("{} {} {}", v.port.index, v.port.link, v.mode),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PortsCommand::Enable(arg) => set_enabled(coordinator, arg.port, true, global).await,

        PortsCommand::Disable(arg) => {
            if !util::confirm(
                &format!("Disable port {}? Anything attached loses its link.", arg.port),
                "ports disable",
                global.yes,
            )? {
                return Ok(());
            }
            set_enabled(coordinator, arg.port, false, global).await
        }

        PortsCommand::Mode(args) => {
            let mode = PortMode::from(args.mode);
            let drops = match mode {
                PortMode::Disabled => Some("Anything attached loses its link."),
                PortMode::EnabledPoeOff => Some("Powered devices on it shut down."),
                PortMode::Enabled | PortMode::EnabledPoeOn => None,
            };
            if let Some(warning) = drops {
                if !util::confirm(
                    &format!("Set port {} to {mode}? {warning}", args.port),
                    "ports mode",
                    global.yes,
                )? {
                    return Ok(());
                }
            }
            coordinator.start().await?;
            let outcomes = coordinator.set_port_mode(args.port, mode).await?;
            let out = output::render_list(
                &global.output,
                &outcomes,
                |o| OutcomeRow {
                    outcome: util::describe_outcome(o),
                },
                util::describe_outcome,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Result")]
    outcome: String,
}

async fn set_enabled(
    coordinator: &Coordinator,
    port: u16,
    enabled: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.start().await?;
    let outcome = coordinator.set_port_enabled(port, enabled).await?;
    let out = output::render_single(
        &global.output,
        &outcome,
        util::describe_outcome,
        util::describe_outcome,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
