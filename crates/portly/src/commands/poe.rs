//! PoE command handlers.

use serde::Serialize;
use tabled::Tabled;

use portly_core::{Coordinator, PoeDelivery, PoeStatus};

use crate::cli::{GlobalOpts, OutputFormat, PoeArgs, PoeCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PoeRow {
    #[tabled(rename = "Port")]
    index: u16,
    #[tabled(rename = "Admin")]
    admin: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Draw")]
    draw: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Priority")]
    priority: String,
}

fn row(poe: &PoeStatus, color: bool) -> PoeRow {
    PoeRow {
        index: poe.index,
        admin: poe.admin.to_string(),
        status: output::paint_delivery(poe.delivery, color),
        draw: output::watts(poe.power_draw_w),
        class: poe.power_class.map_or_else(|| "-".into(), |c| c.to_string()),
        priority: poe.priority.map_or_else(|| "-".into(), |p| p.to_string()),
    }
}

/// The PoE list plus the switch-wide draw, for structured formats.
#[derive(Serialize)]
struct PoeSummary<'a> {
    total_draw_w: f64,
    ports: &'a [PoeStatus],
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    coordinator: &Coordinator,
    args: PoeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PoeCommand::List => {
            let snapshot = util::fresh_snapshot(coordinator).await?;
            let ports: Vec<PoeStatus> = coordinator
                .list_ports()?
                .into_iter()
                .map(|v| v.poe)
                .filter(|p| p.delivery != PoeDelivery::NotApplicable)
                .collect();
            let color = output::should_color(&global.color);

            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => {
                    let mut out = output::render_list(
                        &global.output,
                        &ports,
                        |p| row(p, color),
                        |p| format!("{} {} {}", p.index, p.delivery, output::watts(p.power_draw_w)),
                    )?;
                    if matches!(global.output, OutputFormat::Table) {
                        out.push_str(&format!(
                            "\nTotal draw: {}",
                            output::watts(Some(snapshot.total_poe_draw_w()))
                        ));
                    }
                    out
                }
                _ => output::render_single(
                    &global.output,
                    &PoeSummary {
                        total_draw_w: snapshot.total_poe_draw_w(),
                        ports: &ports,
                    },
                    |_| String::new(),
                    |_| String::new(),
                )?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PoeCommand::Enable(arg) => set_enabled(coordinator, arg.port, true, global).await,

        PoeCommand::Disable(arg) => {
            if !util::confirm(
                &format!("Turn off PoE on port {}? Powered devices will shut down.", arg.port),
                "poe disable",
                global.yes,
            )? {
                return Ok(());
            }
            set_enabled(coordinator, arg.port, false, global).await
        }
    }
}

async fn set_enabled(
    coordinator: &Coordinator,
    port: u16,
    enabled: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.start().await?;
    let outcome = coordinator.set_poe_enabled(port, enabled).await?;
    let out = output::render_single(
        &global.output,
        &outcome,
        util::describe_outcome,
        util::describe_outcome,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
