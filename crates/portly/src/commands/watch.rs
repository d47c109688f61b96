//! Watch command: run the coordinator and print what it observes.
//!
//! Structured formats emit one compact JSON document per line; table and
//! plain formats emit one human-readable line per snapshot or event.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use portly_core::{Coordinator, CoordinatorEvent, LinkState, Snapshot, SnapshotOrigin};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

/// Tagged line for structured output.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WatchLine<'a> {
    Snapshot { snapshot: &'a Snapshot },
    Event { event: &'a CoordinatorEvent },
}

fn snapshot_line(snapshot: &Snapshot) -> String {
    let visible: Vec<_> = snapshot.visible_ports().collect();
    let up = visible.iter().filter(|p| p.link == LinkState::Up).count();
    let origin = match snapshot.origin {
        SnapshotOrigin::FullPoll => "poll".to_owned(),
        SnapshotOrigin::PortRefresh { port } => format!("refresh port {port}"),
    };
    let mut line = format!(
        "{} #{} {origin}: {up}/{} ports up, PoE {}",
        snapshot.captured_at.format("%H:%M:%S"),
        snapshot.sequence,
        visible.len(),
        output::watts(Some(snapshot.total_poe_draw_w())),
    );
    if snapshot.is_partial() {
        line.push_str(" (partial)");
    }
    line
}

fn event_line(event: &CoordinatorEvent, color: bool) -> String {
    let at = event.at().format("%H:%M:%S");
    match event {
        CoordinatorEvent::HealthChanged { transition, .. } => {
            let cause = transition
                .cause
                .map_or_else(String::new, |c| format!(", last failure: {c}"));
            format!(
                "{at} health {} -> {} ({} consecutive failures{cause})",
                output::paint_health(transition.from, color),
                output::paint_health(transition.to, color),
                transition.consecutive_failures,
            )
        }
        CoordinatorEvent::ParseFailed {
            command, reason, ..
        } => format!("{at} could not read '{command}': {reason}"),
        CoordinatorEvent::WriteCompleted {
            port, op, attempts, ..
        } => format!("{at} port {port}: {op} applied ({attempts} attempts)"),
        CoordinatorEvent::WriteFailed {
            port, op, error, ..
        } => format!("{at} port {port}: {op} failed: {error}"),
    }
}

fn emit(line: &WatchLine<'_>, global: &GlobalOpts, color: bool) -> Result<(), CliError> {
    let text = match global.output {
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(line, true)?,
        OutputFormat::Yaml => format!("---\n{}", serde_yaml_line(line)?),
        OutputFormat::Table | OutputFormat::Plain => match line {
            WatchLine::Snapshot { snapshot } => snapshot_line(snapshot),
            WatchLine::Event { event } => event_line(event, color),
        },
    };
    output::print_output(&text, global.quiet);
    Ok(())
}

fn serde_yaml_line(line: &WatchLine<'_>) -> Result<String, CliError> {
    serde_yaml::to_string(line).map_err(|e| CliError::Render(e.to_string()))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    coordinator: &Coordinator,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let mut snapshots = coordinator.subscribe();
    let mut events = coordinator.events();

    coordinator.start().await?;
    info!(
        interval_secs = coordinator.config().poll_interval.as_secs(),
        "watching switch, Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }

            received = events.recv() => match received {
                Ok(event) => emit(&WatchLine::Event { event: &event }, global, color)?,
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },

            changed = snapshots.changed(), if !args.events_only => {
                let Some(snapshot): Option<Arc<Snapshot>> = changed else {
                    break;
                };
                emit(&WatchLine::Snapshot { snapshot: &snapshot }, global, color)?;
            }
        }
    }
    Ok(())
}
