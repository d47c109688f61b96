//! Clap derive structures for the `portly` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// portly -- watch and steer ProCurve/Aruba switch ports over SSH
#[derive(Debug, Parser)]
#[command(
    name = "portly",
    version,
    about = "Monitor and control ProCurve/Aruba switch ports over SSH",
    long_about = "Polls a managed switch over its SSH command line and reports\n\
        port, link, traffic and PoE state. Port and PoE changes are queued\n\
        and applied one at a time on the device session.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Switch profile to use
    #[arg(long, short = 'p', env = "PORTLY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Switch hostname or address (overrides profile)
    #[arg(long, short = 'H', env = "PORTLY_HOST", global = true)]
    pub host: Option<String>,

    /// SSH username (overrides profile)
    #[arg(long, short = 'u', env = "PORTLY_USERNAME", global = true)]
    pub username: Option<String>,

    /// SSH port (overrides profile)
    #[arg(long, env = "PORTLY_SSH_PORT", global = true)]
    pub ssh_port: Option<u16>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PORTLY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show switch identity, health and a port summary
    #[command(alias = "st")]
    Status,

    /// Inspect and toggle switch ports
    #[command(alias = "port")]
    Ports(PortsArgs),

    /// Inspect and toggle Power over Ethernet
    Poe(PoeArgs),

    /// Keep polling and print snapshots and events as they happen
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Ports ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PortsArgs {
    #[command(subcommand)]
    pub command: PortsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PortsCommand {
    /// List every monitored port
    #[command(alias = "ls")]
    List,

    /// Show one port in detail
    Get(PortArg),

    /// Administratively enable a port
    Enable(PortArg),

    /// Administratively disable a port
    Disable(PortArg),

    /// Set the combined port and PoE mode of a port
    Mode(ModeArgs),
}

/// A 1-based port index.
#[derive(Debug, Args)]
pub struct PortArg {
    /// Port number (1-based)
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,
}

#[derive(Debug, Args)]
pub struct ModeArgs {
    /// Port number (1-based)
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Target mode
    pub mode: PortModeArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PortModeArg {
    /// Port administratively down
    Disabled,
    /// Port up, PoE left as it is
    Enabled,
    /// Port up with PoE on
    EnabledPoeOn,
    /// Port up with PoE off
    EnabledPoeOff,
}

impl From<PortModeArg> for portly_core::PortMode {
    fn from(mode: PortModeArg) -> Self {
        match mode {
            PortModeArg::Disabled => Self::Disabled,
            PortModeArg::Enabled => Self::Enabled,
            PortModeArg::EnabledPoeOn => Self::EnabledPoeOn,
            PortModeArg::EnabledPoeOff => Self::EnabledPoeOff,
        }
    }
}

// ── PoE ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PoeArgs {
    #[command(subcommand)]
    pub command: PoeCommand,
}

#[derive(Debug, Subcommand)]
pub enum PoeCommand {
    /// List PoE state of every monitored port
    #[command(alias = "ls")]
    List,

    /// Turn PoE on for a port
    Enable(PortArg),

    /// Turn PoE off for a port
    Disable(PortArg),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Print only events, not every snapshot
    #[arg(long)]
    pub events_only: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the loaded configuration
    Show,

    /// Store a profile's SSH password in the system keyring
    SetPassword {
        /// Read the password from stdin instead of prompting
        #[arg(long)]
        stdin: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
