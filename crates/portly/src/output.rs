//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use portly_core::{Health, LinkState, PoeDelivery};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

pub fn paint_health(health: Health, color: bool) -> String {
    let text = health.to_string();
    if !color {
        return text;
    }
    match health {
        Health::Online => text.green().to_string(),
        Health::Degraded => text.yellow().to_string(),
        Health::Offline => text.red().bold().to_string(),
    }
}

pub fn paint_link(link: LinkState, color: bool) -> String {
    let text = link.to_string();
    if !color {
        return text;
    }
    match link {
        LinkState::Up => text.green().to_string(),
        LinkState::Down => text.dimmed().to_string(),
        LinkState::Unknown => text.yellow().to_string(),
    }
}

pub fn paint_delivery(delivery: PoeDelivery, color: bool) -> String {
    let text = delivery.to_string();
    if !color {
        return text;
    }
    match delivery {
        PoeDelivery::Delivering => text.green().to_string(),
        PoeDelivery::Fault | PoeDelivery::Denied => text.red().to_string(),
        PoeDelivery::Unknown => text.yellow().to_string(),
        _ => text.dimmed().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `line_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&line_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted
/// string, since single-item detail views don't use `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(line_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_json<T: serde::Serialize + ?Sized>(
    data: &T,
    compact: bool,
) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}

/// `4.8 W`, or `-` when unknown.
pub fn watts(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |w| format!("{w:.1} W"))
}

/// Human byte rate such as `12.3 KB/s`, or `-` when unknown.
pub fn byte_rate(value: Option<f64>) -> String {
    let Some(bps) = value else {
        return "-".into();
    };
    let (scaled, unit) = if bps >= 1_000_000.0 {
        (bps / 1_000_000.0, "MB/s")
    } else if bps >= 1_000.0 {
        (bps / 1_000.0, "KB/s")
    } else {
        (bps, "B/s")
    };
    format!("{scaled:.1} {unit}")
}
