//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, FileLastIpStore};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Helpers ─────────────────────────────────────────────────────────

fn invalid(field: &str, reason: impl Into<String>) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Keys that may be absent from the serialized config.
const OPTIONAL_KEYS: &[&str] = &["controller.ca_cert"];

/// Apply `section.key = value` to a config, keeping the existing value's
/// TOML type.
fn set_value(cfg: &Config, key: &str, raw: &str) -> Result<Config, CliError> {
    let (section, field) = key.split_once('.').ok_or_else(|| {
        invalid(
            key,
            "expected section.key, e.g. controller.request_timeout_secs",
        )
    })?;

    let mut doc = toml::Value::try_from(cfg).map_err(|e| invalid(key, e.to_string()))?;
    let table = doc
        .get_mut(section)
        .and_then(toml::Value::as_table_mut)
        .ok_or_else(|| {
            invalid(
                key,
                format!(
                    "unknown section '{section}'. Valid: defaults, discovery, controller, state"
                ),
            )
        })?;

    let value = match table.get(field) {
        Some(toml::Value::Integer(_)) => raw
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| invalid(key, "must be a whole number"))?,
        Some(toml::Value::Boolean(_)) => raw
            .parse::<bool>()
            .map(toml::Value::Boolean)
            .map_err(|_| invalid(key, "must be 'true' or 'false'"))?,
        Some(_) => toml::Value::String(raw.to_owned()),
        None if OPTIONAL_KEYS.contains(&key) => toml::Value::String(raw.to_owned()),
        None => return Err(invalid(key, format!("unknown key '{field}' in [{section}]"))),
    };
    table.insert(field.to_owned(), value);

    let updated: Config = doc
        .try_into()
        .map_err(|e: toml::de::Error| invalid(key, e.to_string()))?;
    updated.validate()?;
    Ok(updated)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let format = global.output.unwrap_or(OutputFormat::Table);
    match args.command {
        ConfigCommand::Init => {
            let path = config::config_path();
            if path.exists()
                && !util::confirm(
                    &format!("Overwrite {} with defaults?", path.display()),
                    global.yes,
                )?
            {
                return Ok(());
            }
            config::save_config(&Config::default())?;
            if !global.quiet {
                eprintln!("✓ Configuration written to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = camlink_config::load_config_or_default();
            let out = output::render_single(
                format,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_default(),
                |_| config::config_path().display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let cfg = config::load_config()?;
            let updated = set_value(&cfg, &key, &value)?;
            config::save_config(&updated)?;
            if !global.quiet {
                eprintln!("✓ Set {key} = {value}");
            }
            Ok(())
        }

        ConfigCommand::ForgetIp => {
            let store = FileLastIpStore::in_data_dir();
            match std::fs::remove_file(store.path()) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            if !global.quiet {
                eprintln!("✓ Last camera IP forgotten");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn set_keeps_integer_type() {
        let cfg = set_value(&Config::default(), "controller.request_timeout_secs", "12").unwrap();
        assert_eq!(cfg.controller.request_timeout_secs, 12);
    }

    #[test]
    fn set_parses_booleans() {
        let cfg = set_value(&Config::default(), "state.auto_connect", "false").unwrap();
        assert!(!cfg.state.auto_connect);
        assert!(set_value(&Config::default(), "state.auto_connect", "nope").is_err());
    }

    #[test]
    fn set_accepts_optional_paths() {
        let cfg = set_value(&Config::default(), "controller.ca_cert", "/etc/ca.pem").unwrap();
        assert_eq!(cfg.controller.ca_cert, Some(PathBuf::from("/etc/ca.pem")));
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        assert!(set_value(&Config::default(), "timeout", "5").is_err());
        assert!(set_value(&Config::default(), "camera.iso", "100").is_err());
        assert!(set_value(&Config::default(), "controller.bogus", "1").is_err());
        assert!(set_value(&Config::default(), "discovery.search_mx", "9").is_err());
    }
}
