//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use camlink_config::ConfigError;
use camlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const CAMERA: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("No camera found within {seconds}s")]
    #[diagnostic(
        code(camlink::no_camera),
        help(
            "Check that the camera's Wi-Fi is on and CCAPI is enabled.\n\
             Pass --ip to connect directly, or --interface NAME=IPV4 to pick\n\
             the network the camera is on."
        )
    )]
    NoCamera { seconds: u64 },

    #[error("Could not connect to camera at {address}")]
    #[diagnostic(
        code(camlink::connection_failed),
        help(
            "Check that the camera is on the same network and CCAPI is enabled.\n\
             Try: camlink --ip {address} info"
        )
    )]
    ConnectionFailed {
        address: String,
        #[source]
        source: CoreError,
    },

    #[error("{0}")]
    #[diagnostic(
        code(camlink::device_needs_restart),
        help("Turn the camera off and on again, then reconnect.")
    )]
    DeviceNeedsRestart(CoreError),

    #[error("Discovery failed: {message}")]
    #[diagnostic(
        code(camlink::discovery),
        help(
            "Port 1900 may be in use by another SSDP listener.\n\
             Set discovery.bind_port = 0 in the config, or pass --ip."
        )
    )]
    Discovery { message: String },

    // ── Camera ───────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(camlink::camera))]
    Camera(CoreError),

    #[error("Setting '{name}' not reported by the camera")]
    #[diagnostic(
        code(camlink::unknown_setting),
        help("Run: camlink settings to see what the camera exposes")
    )]
    UnknownSetting { name: String },

    #[error("Interval of {interval}s is too short")]
    #[diagnostic(code(camlink::interval), help("{reason}"))]
    IntervalTooShort { interval: f64, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(camlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(camlink::config),
        help("Run: camlink config show  or  camlink config init")
    )]
    Config(#[from] ConfigError),

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(camlink::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoCamera { .. }
            | Self::ConnectionFailed { .. }
            | Self::DeviceNeedsRestart(_)
            | Self::Discovery { .. } => exit_code::CONNECTION,
            Self::UnknownSetting { .. } => exit_code::NOT_FOUND,
            Self::Camera(_) => exit_code::CAMERA,
            Self::Validation { .. }
            | Self::IntervalTooShort { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Config(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceNeedsRestart { .. } => Self::DeviceNeedsRestart(err),
            CoreError::Discovery { message } => Self::Discovery { message },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            other => Self::Camera(other),
        }
    }
}
