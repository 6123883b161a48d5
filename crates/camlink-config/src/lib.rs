//! Shared configuration for camlink tools.
//!
//! TOML file + `CAMLINK_` environment layering via figment, translation
//! into the runtime types of `camlink_core`, and a file-backed
//! [`LastIpStore`] so the state manager remembers the last camera address
//! across restarts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use camlink_core::{ControllerConfig, DiscoveryConfig, LastIpStore, ManagerConfig, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Output defaults for the CLI.
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub discovery: DiscoverySection,

    #[serde(default)]
    pub controller: ControllerSection,

    #[serde(default)]
    pub state: StateSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// `[discovery]`: SSDP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoverySection {
    pub bind_port: u16,
    pub search_interval_secs: u64,
    /// Seconds a device may wait before answering an M-SEARCH (1..=5).
    pub search_mx: u8,
    pub description_timeout_ms: u64,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        let base = DiscoveryConfig::default();
        Self {
            bind_port: base.bind_port,
            search_interval_secs: base.search_interval.as_secs(),
            search_mx: base.search_mx,
            description_timeout_ms: millis(base.description_timeout),
        }
    }
}

/// `[controller]`: per-camera connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerSection {
    /// Accept the camera's self-signed certificate.
    pub insecure: bool,
    /// Path to a CA certificate; used only when `insecure` is false.
    pub ca_cert: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub press_timeout_secs: u64,
    pub release_timeout_secs: u64,
    pub shutter_settle_ms: u64,
    pub max_connect_retries: u32,
    pub gateway_retry_delay_ms: u64,
    /// Zero disables the heartbeat.
    pub health_check_interval_secs: u64,
    pub max_consecutive_failures: u32,
    /// Zero disables the settings poll.
    pub info_poll_interval_secs: u64,
}

impl Default for ControllerSection {
    fn default() -> Self {
        let base = ControllerConfig::default();
        Self {
            insecure: true,
            ca_cert: None,
            request_timeout_secs: base.request_timeout.as_secs(),
            press_timeout_secs: base.press_timeout.as_secs(),
            release_timeout_secs: base.release_timeout.as_secs(),
            shutter_settle_ms: millis(base.shutter_settle),
            max_connect_retries: base.max_connect_retries,
            gateway_retry_delay_ms: millis(base.gateway_retry_delay),
            health_check_interval_secs: base.health_check_interval.as_secs(),
            max_consecutive_failures: base.max_consecutive_failures,
            info_poll_interval_secs: base.info_poll_interval.as_secs(),
        }
    }
}

/// `[state]`: registry behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StateSection {
    pub history_limit: usize,
    pub auto_connect: bool,
    /// Persist the last successful camera IP in the data directory.
    pub remember_last_ip: bool,
}

impl Default for StateSection {
    fn default() -> Self {
        let base = ManagerConfig::default();
        Self {
            history_limit: base.history_limit,
            auto_connect: base.auto_connect,
            remember_last_ip: true,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=5).contains(&self.discovery.search_mx) {
            return Err(invalid(
                "discovery.search_mx",
                format!("expected 1..=5, got {}", self.discovery.search_mx),
            ));
        }
        if self.discovery.search_interval_secs == 0 {
            return Err(invalid("discovery.search_interval_secs", "must be positive"));
        }
        if self.controller.request_timeout_secs == 0 {
            return Err(invalid("controller.request_timeout_secs", "must be positive"));
        }
        if self.controller.max_consecutive_failures == 0 {
            return Err(invalid(
                "controller.max_consecutive_failures",
                "must be positive",
            ));
        }
        if self.state.history_limit == 0 {
            return Err(invalid("state.history_limit", "must be positive"));
        }
        match self.defaults.output.as_str() {
            "table" | "json" | "plain" => {}
            other => {
                return Err(invalid(
                    "defaults.output",
                    format!("expected 'table', 'json', or 'plain', got '{other}'"),
                ));
            }
        }
        Ok(())
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        let d = &self.discovery;
        DiscoveryConfig {
            bind_port: d.bind_port,
            search_interval: Duration::from_secs(d.search_interval_secs),
            search_mx: d.search_mx,
            description_timeout: Duration::from_millis(d.description_timeout_ms),
            ..DiscoveryConfig::default()
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        let c = &self.controller;
        let tls = if c.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = c.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        ControllerConfig {
            tls,
            request_timeout: Duration::from_secs(c.request_timeout_secs),
            press_timeout: Duration::from_secs(c.press_timeout_secs),
            release_timeout: Duration::from_secs(c.release_timeout_secs),
            shutter_settle: Duration::from_millis(c.shutter_settle_ms),
            max_connect_retries: c.max_connect_retries,
            gateway_retry_delay: Duration::from_millis(c.gateway_retry_delay_ms),
            health_check_interval: Duration::from_secs(c.health_check_interval_secs),
            max_consecutive_failures: c.max_consecutive_failures,
            info_poll_interval: Duration::from_secs(c.info_poll_interval_secs),
        }
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            controller: self.controller_config(),
            history_limit: self.state.history_limit,
            auto_connect: self.state.auto_connect,
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "camlink", "camlink")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || fallback_dir(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for runtime state such as the last camera IP.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || fallback_dir(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn fallback_dir(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("camlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
///
/// Environment overrides use a double underscore between section and
/// key, e.g. `CAMLINK_CONTROLLER__REQUEST_TIMEOUT_SECS=8`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CAMLINK_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if anything goes wrong.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|err| {
        warn!(error = %err, "config unusable, falling back to defaults");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Last-IP persistence ─────────────────────────────────────────────

/// [`LastIpStore`] backed by a one-line text file.
///
/// Write failures are logged, never propagated: losing the hint only
/// costs an automatic reconnect.
#[derive(Debug, Clone)]
pub struct FileLastIpStore {
    path: PathBuf,
}

impl FileLastIpStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data dir>/last_ip`.
    pub fn in_data_dir() -> Self {
        Self::new(data_dir().join("last_ip"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, ip: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, format!("{ip}\n"))
    }
}

impl LastIpStore for FileLastIpStore {
    fn record(&self, ip: &str) {
        if let Err(err) = self.write(ip) {
            warn!(path = %self.path.display(), error = %err, "failed to persist last IP");
        }
    }

    fn read(&self) -> Option<String> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        let ip = raw.trim();
        (!ip.is_empty()).then(|| ip.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_file(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "[controller]\nrequest_timeout_secs = 8\nhealth_check_interval_secs = 0\n\n[state]\nauto_connect = false\n",
        );
        let cfg = load_config_from(&path).unwrap();

        assert_eq!(cfg.controller.request_timeout_secs, 8);
        assert_eq!(cfg.controller.press_timeout_secs, 35);
        assert!(!cfg.state.auto_connect);
        assert_eq!(cfg.state.history_limit, 10);
        assert_eq!(cfg.discovery, DiscoverySection::default());

        let controller = cfg.controller_config();
        assert_eq!(controller.request_timeout, Duration::from_secs(8));
        assert_eq!(controller.health_check_interval, Duration::ZERO);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "[discovery]\nsearch_mx = 9\n");
        let err = load_config_from(&path).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation { ref field, .. } if field == "discovery.search_mx")
        );
    }

    #[test]
    fn malformed_toml_is_a_figment_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "[controller\n");
        assert!(matches!(
            load_config_from(&path).unwrap_err(),
            ConfigError::Figment(_)
        ));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.defaults.output = "json".into();
        cfg.discovery.search_interval_secs = 15;

        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }

    #[test]
    fn tls_mode_follows_insecure_and_ca_cert() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.controller_config().tls,
            TlsVerification::DangerAcceptInvalid
        );

        cfg.controller.insecure = false;
        assert_eq!(cfg.controller_config().tls, TlsVerification::SystemDefaults);

        cfg.controller.ca_cert = Some(PathBuf::from("/etc/camlink/ca.pem"));
        assert_eq!(
            cfg.controller_config().tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/camlink/ca.pem"))
        );
    }

    #[test]
    fn manager_config_carries_state_section() {
        let mut cfg = Config::default();
        cfg.state.history_limit = 3;
        cfg.state.auto_connect = false;
        let manager = cfg.manager_config();
        assert_eq!(manager.history_limit, 3);
        assert!(!manager.auto_connect);
        assert_eq!(manager.controller.max_connect_retries, 3);
    }

    #[test]
    fn file_store_persists_latest_ip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLastIpStore::new(dir.path().join("state").join("last_ip"));
        assert_eq!(store.read(), None);

        store.record("192.168.1.2");
        store.record("192.168.1.7");
        assert_eq!(store.read().as_deref(), Some("192.168.1.7"));

        let reopened = FileLastIpStore::new(store.path());
        assert_eq!(reopened.read().as_deref(), Some("192.168.1.7"));
    }
}
