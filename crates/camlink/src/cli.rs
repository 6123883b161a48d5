//! Clap derive structures for the `camlink` CLI.
//!
//! Defines the command tree, global flags, and shared types. Only clap and
//! std types appear here so `build.rs` can include this file for man pages.

use std::net::IpAddr;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// camlink -- find and drive Canon cameras over CCAPI
#[derive(Debug, Parser)]
#[command(
    name = "camlink",
    version,
    about = "Discover and control Canon CCAPI cameras from the command line",
    long_about = "Finds Canon cameras advertising the Camera Control API over SSDP,\n\
        connects to one and exposes its settings, status and shutter.\n\n\
        Without --ip the camera is located by discovery, falling back to the\n\
        last address that worked.",
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
    /// Camera IP address (skips discovery)
    #[arg(long, env = "CAMLINK_IP", global = true)]
    pub ip: Option<IpAddr>,

    /// CCAPI port
    #[arg(long, env = "CAMLINK_PORT", default_value = "443", global = true)]
    pub port: u16,

    /// Local interface to search on, as NAME=IPV4 (repeatable)
    #[arg(long = "interface", short = 'i', value_name = "NAME=IPV4", global = true)]
    pub interfaces: Vec<String>,

    /// Seconds to wait for a camera during discovery
    #[arg(long, env = "CAMLINK_DISCOVER_TIMEOUT", default_value = "10", global = true)]
    pub discover_timeout: u64,

    /// Output format (defaults to the config file's setting)
    #[arg(long, short = 'o', env = "CAMLINK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

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

    /// Accept the camera's self-signed certificate
    #[arg(long, short = 'k', env = "CAMLINK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long, env = "CAMLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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
    /// List cameras advertising on the local network
    #[command(alias = "scan")]
    Discover(DiscoverArgs),

    /// Follow discovery and connection events until interrupted
    Watch(WatchArgs),

    /// Show device information, battery, storage and temperature
    Info,

    /// Show the connection state and recent connection history
    Status,

    /// Show current shooting settings
    #[command(alias = "get")]
    Settings(SettingsArgs),

    /// Change one shooting setting
    Set(SetArgs),

    /// Take one or more photos
    Shoot(ShootArgs),

    /// Read or set the camera clock
    #[command(alias = "dt")]
    Datetime(DatetimeArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DISCOVERY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Seconds to listen before printing results
    #[arg(long, short = 'w', default_value = "5")]
    pub wait: u64,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many seconds (default: until Ctrl-C)
    #[arg(long, short = 'd')]
    pub duration: Option<u64>,

    /// Also long-poll the primary camera for property changes
    #[arg(long)]
    pub events: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SETTINGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Show only this setting (e.g. "tv", "av", "iso")
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Setting name (e.g. "tv", "av", "iso")
    pub name: String,

    /// New value; parsed as JSON when possible, otherwise sent as a string
    pub value: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SHOOTING
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ShootArgs {
    /// Number of photos
    #[arg(long, short = 'n', default_value = "1")]
    pub count: u32,

    /// Seconds between shots; checked against the current shutter speed
    #[arg(long)]
    pub interval: Option<f64>,

    /// Half-press with autofocus before each shot
    #[arg(long)]
    pub af: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DATETIME
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DatetimeArgs {
    #[command(subcommand)]
    pub command: DatetimeCommand,
}

#[derive(Debug, Subcommand)]
pub enum DatetimeCommand {
    /// Show the camera clock
    Get,

    /// Set the camera clock to this host's local time
    Sync,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with default values
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a configuration value
    Set {
        /// Config key as section.key (e.g., "controller.request_timeout_secs")
        key: String,

        /// Value to set
        value: String,
    },

    /// Forget the last successful camera IP
    ForgetIp,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
