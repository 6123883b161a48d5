// ── Core error types ──
//
// Clean, serializable errors surfaced to callers of camlink-core.
// Transport-library error objects never cross this boundary: the
// `From<camlink_api::Error>` impl keeps only the message, HTTP status and
// network classification.

use std::fmt;

use camlink_api::TransportCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failed camera request, reduced to what callers can act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraFault {
    /// Vendor-supplied message when the camera sent one.
    pub message: String,
    /// HTTP status, if the camera answered at all.
    pub status: Option<u16>,
    /// Set for network-class failures (unreachable, refused, timeout,
    /// gateway error).
    pub code: Option<TransportCode>,
}

impl CameraFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
        }
    }

    /// Whether this failure means the camera can no longer be reached.
    pub fn is_network(&self) -> bool {
        self.code.is_some()
    }
}

impl fmt::Display for CameraFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.code) {
            (Some(status), _) => write!(f, "{} (HTTP {status})", self.message),
            (None, Some(code)) => write!(f, "{} ({code})", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl From<&camlink_api::Error> for CameraFault {
    fn from(err: &camlink_api::Error) -> Self {
        Self {
            message: err.clean_message(),
            status: err.status(),
            code: err.transport_code(),
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoreError {
    // ── Camera errors ────────────────────────────────────────────────
    #[error("Camera request failed: {0}")]
    Camera(CameraFault),

    #[error("Camera is not connected")]
    NotConnected,

    #[error(
        "Camera kept returning a gateway error after {attempts} attempts; power-cycle the camera"
    )]
    DeviceNeedsRestart { attempts: u32 },

    #[error("Camera does not expose a shutter control endpoint")]
    NoShutterEndpoint,

    #[error("Shutter press failed: {message}")]
    Shutter { message: String },

    // ── Registry errors ──────────────────────────────────────────────
    #[error("Camera not found: {identity}")]
    CameraNotFound { identity: String },

    #[error("No primary camera")]
    NoPrimaryCamera,

    #[error("Connection to {identity} was superseded while in progress")]
    Superseded { identity: String },

    // ── Discovery errors ─────────────────────────────────────────────
    #[error("Discovery failed: {message}")]
    Discovery { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    /// The camera fault behind this error, if it came from a request.
    pub fn fault(&self) -> Option<&CameraFault> {
        match self {
            Self::Camera(fault) => Some(fault),
            _ => None,
        }
    }

    /// Whether the error is a network-class camera failure.
    pub fn is_network(&self) -> bool {
        self.fault().is_some_and(CameraFault::is_network)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<camlink_api::Error> for CoreError {
    fn from(err: camlink_api::Error) -> Self {
        match err {
            camlink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid camera URL: {e}"),
            },
            camlink_api::Error::Tls(message) => CoreError::Config {
                message: format!("TLS setup failed: {message}"),
            },
            ref other => CoreError::Camera(CameraFault::from(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_vendor_message_and_status() {
        let err: CoreError = camlink_api::Error::Api {
            status: 503,
            message: "Device busy".into(),
        }
        .into();
        let fault = err.fault().cloned().unwrap_or_else(|| CameraFault::new(""));
        assert_eq!(fault.message, "Device busy");
        assert_eq!(fault.status, Some(503));
        assert!(!err.is_network());
    }

    #[test]
    fn gateway_errors_are_network_class() {
        let err: CoreError = camlink_api::Error::Api {
            status: 502,
            message: "Bad Gateway".into(),
        }
        .into();
        assert!(err.is_network());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(CoreError::DeviceNeedsRestart { attempts: 4 })
            .unwrap_or_default();
        assert_eq!(json["kind"], "device_needs_restart");
        assert_eq!(json["attempts"], 4);
    }
}
