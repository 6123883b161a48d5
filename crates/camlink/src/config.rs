//! CLI configuration: thin wrapper around `camlink_config`.
//!
//! Loads the shared config and applies `GlobalOpts` flag overrides
//! (--insecure, --timeout, --output, --color).

use camlink_core::NetworkInterface;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

// ── Re-exports from shared crate ────────────────────────────────────

pub use camlink_config::{Config, FileLastIpStore, config_path, load_config, save_config};

/// Config plus the flag-resolved presentation settings every command uses.
pub struct Context {
    pub config: Config,
    pub output: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Context {
    pub fn resolve(global: &GlobalOpts) -> Result<Self, CliError> {
        let mut config = load_config()?;
        apply_overrides(&mut config, global);

        let output = match global.output {
            Some(format) => format,
            None => parse_output(&config.defaults.output)?,
        };
        let color = match (global.color, config.defaults.color.as_str()) {
            (ColorMode::Auto, "always") => true,
            (ColorMode::Auto, "never") => false,
            (mode, _) => output::should_color(mode),
        };

        Ok(Self {
            config,
            output,
            color,
            quiet: global.quiet,
        })
    }
}

/// CLI flags take priority over file and environment values.
pub fn apply_overrides(config: &mut Config, global: &GlobalOpts) {
    if global.insecure {
        config.controller.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        config.controller.request_timeout_secs = timeout;
    }
}

fn parse_output(value: &str) -> Result<OutputFormat, CliError> {
    match value {
        "table" => Ok(OutputFormat::Table),
        "json" => Ok(OutputFormat::Json),
        "plain" => Ok(OutputFormat::Plain),
        other => Err(CliError::Validation {
            field: "defaults.output".into(),
            reason: format!("expected 'table', 'json', or 'plain', got '{other}'"),
        }),
    }
}

/// Parse `--interface NAME=IPV4` values.
pub fn parse_interfaces(values: &[String]) -> Result<Vec<NetworkInterface>, CliError> {
    values
        .iter()
        .map(|value| {
            let invalid = || CliError::Validation {
                field: "interface".into(),
                reason: format!("expected NAME=IPV4, got '{value}'"),
            };
            let (name, ip) = value.split_once('=').ok_or_else(invalid)?;
            if name.is_empty() {
                return Err(invalid());
            }
            let ip = ip.trim().parse().map_err(|_| invalid())?;
            Ok(NetworkInterface::new(name.trim(), ip))
        })
        .collect()
}
