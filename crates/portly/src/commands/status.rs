//! Status command: identity, health and a one-screen port summary.

use chrono::{DateTime, Utc};
use serde::Serialize;

use portly_core::{ConnectivityState, Coordinator, DeviceIdentity, LinkState, Snapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct StatusView {
    host: String,
    sequence: u64,
    captured_at: DateTime<Utc>,
    partial: bool,
    identity: DeviceIdentity,
    connectivity: ConnectivityState,
    ports_total: usize,
    ports_up: usize,
    ports_disabled: usize,
    ports_active: usize,
    poe_delivering: usize,
    poe_draw_w: f64,
}

impl StatusView {
    fn new(host: String, snapshot: &Snapshot, connectivity: ConnectivityState) -> Self {
        let visible: Vec<_> = snapshot.visible_ports().collect();
        Self {
            host,
            sequence: snapshot.sequence,
            captured_at: snapshot.captured_at,
            partial: snapshot.is_partial(),
            identity: snapshot.identity.clone(),
            connectivity,
            ports_total: visible.len(),
            ports_up: visible.iter().filter(|p| p.link == LinkState::Up).count(),
            ports_disabled: visible.iter().filter(|p| !p.is_enabled()).count(),
            ports_active: visible.iter().filter(|p| p.active == Some(true)).count(),
            poe_delivering: visible
                .iter()
                .filter_map(|p| snapshot.poe(p.index))
                .filter(|poe| poe.delivering())
                .count(),
            poe_draw_w: snapshot.total_poe_draw_w(),
        }
    }
}

fn detail(view: &StatusView, color: bool) -> String {
    let id = &view.identity;
    let dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    let mut lines = vec![
        format!("Switch:    {}", view.host),
        format!("Hostname:  {}", dash(&id.hostname)),
        format!("Model:     {}", dash(&id.model)),
        format!("Firmware:  {}", dash(&id.firmware)),
        format!("Serial:    {}", dash(&id.serial_number)),
        format!("Uptime:    {}", dash(&id.uptime)),
        format!(
            "Health:    {}",
            output::paint_health(view.connectivity.health, color)
        ),
        format!(
            "Ports:     {} up / {} total ({} disabled, {} active)",
            view.ports_up, view.ports_total, view.ports_disabled, view.ports_active
        ),
        format!(
            "PoE:       {} delivering, {}",
            view.poe_delivering,
            output::watts(Some(view.poe_draw_w))
        ),
        format!(
            "Polled:    {} (#{})",
            view.captured_at.format("%Y-%m-%d %H:%M:%S UTC"),
            view.sequence
        ),
    ];
    if let Some(took) = view.connectivity.last_poll_duration {
        lines.push(format!("Poll time: {:.1}s", took.as_secs_f64()));
    }
    if view.partial {
        lines.push("Note:      some readings failed this poll; their fields are unknown".into());
    }
    lines.join("\n")
}

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = util::fresh_snapshot(coordinator).await?;
    let view = StatusView::new(
        coordinator.config().transport.host.clone(),
        &snapshot,
        coordinator.get_connectivity(),
    );
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, color),
        |v| v.connectivity.health.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
