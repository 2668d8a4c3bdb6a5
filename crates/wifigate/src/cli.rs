//! Clap derive structures for the `wifigate` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wifigate -- captive-portal allow-list operator tool
#[derive(Debug, Parser)]
#[command(
    name = "wifigate",
    version,
    about = "Operate the UniFi captive-portal allow-list from the command line",
    long_about = "Inspect and edit SSID MAC allow-lists, authorize or revoke guests,\n\
        and converge an SSID to a known device set on a UniFi controller.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "WIFIGATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WIFIGATE_OUTPUT",
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
}

#[derive(Debug, Clone, Copy, ValueEnum)]
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

#[derive(Debug, Clone, Copy, ValueEnum)]
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
    /// Inspect and edit an SSID's MAC allow-list
    #[command(alias = "al")]
    Allowlist(AllowlistArgs),

    /// Authorize, revoke or inspect guest sessions
    #[command(alias = "g")]
    Guest(GuestArgs),

    /// Converge SSID allow-lists to a device set read from JSON
    Sync(SyncArgs),

    /// Print the canonical form of a MAC address
    Mac(MacArgs),

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Allow-list ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AllowlistArgs {
    #[command(subcommand)]
    pub command: AllowlistCommand,
}

#[derive(Debug, Subcommand)]
pub enum AllowlistCommand {
    /// List the MACs on an SSID's allow-list
    #[command(alias = "ls")]
    Show {
        /// SSID name (defaults to the configured visitor SSID)
        #[arg(long, short = 's')]
        ssid: Option<String>,
    },

    /// Add MACs to an SSID's allow-list
    Add {
        /// MAC addresses in any common notation
        #[arg(required = true)]
        macs: Vec<String>,

        /// SSID name (defaults to the configured visitor SSID)
        #[arg(long, short = 's')]
        ssid: Option<String>,
    },

    /// Remove MACs from an SSID's allow-list
    #[command(alias = "rm")]
    Remove {
        /// MAC addresses in any common notation
        #[arg(required = true)]
        macs: Vec<String>,

        /// SSID name (defaults to the configured visitor SSID)
        #[arg(long, short = 's')]
        ssid: Option<String>,
    },
}

// ── Guests ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GuestArgs {
    #[command(subcommand)]
    pub command: GuestCommand,
}

#[derive(Debug, Subcommand)]
pub enum GuestCommand {
    /// Authorize a device as a guest
    Authorize {
        /// Device MAC address
        mac: String,

        /// Authorization length in minutes (0 = no expiry; defaults to config)
        #[arg(long, short = 'm')]
        minutes: Option<u32>,

        /// MAC of the access point the device is attached to
        #[arg(long)]
        ap: Option<String>,
    },

    /// Revoke a guest authorization
    Revoke {
        /// Device MAC address
        mac: String,

        /// Also kick the station (unauthorize-sta)
        #[arg(long)]
        station: bool,
    },

    /// Show the controller's latest guest session for a device
    Status {
        /// Device MAC address
        mac: String,
    },
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// JSON file mapping SSID names to MAC lists (`-` reads stdin)
    #[arg(long, short = 'd', value_name = "JSON")]
    pub devices: PathBuf,

    /// Only converge this SSID
    #[arg(long, short = 's')]
    pub ssid: Option<String>,

    /// Show what would change without writing
    #[arg(long)]
    pub dry_run: bool,
}

// ── MAC ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MacArgs {
    /// Raw MAC address (colons, dashes, dots or bare hex)
    pub raw: String,
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

    /// Show the effective configuration (password masked)
    Show,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
