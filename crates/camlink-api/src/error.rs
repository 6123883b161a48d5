use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for the `camlink-api` crate.
///
/// Covers every failure mode of the wire layer: HTTP transport, CCAPI
/// status errors, SSDP/description parsing and socket I/O.
/// `camlink-core` translates these into clean, serializable faults.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TLS setup error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Socket-level I/O error (UDP bind, multicast membership).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── CCAPI ───────────────────────────────────────────────────────
    /// Non-2xx response from the camera. `message` is the vendor-supplied
    /// `message` field when the body carries one.
    #[error("Camera API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Device description document could not be parsed.
    #[error("Invalid device description: {0}")]
    Description(String),
}

/// Network-level classification of a failure, carried across the
/// api/core boundary instead of the transport library's error object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportCode {
    /// Host or network unreachable, DNS failure.
    Unreachable,
    /// Connection actively refused.
    Refused,
    /// Request timed out.
    TimedOut,
    /// Upstream gateway error reported by the camera (HTTP 502).
    BadGateway,
}

impl TransportCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::Refused => "refused",
            Self::TimedOut => "timed_out",
            Self::BadGateway => "bad_gateway",
        }
    }
}

impl std::fmt::Display for TransportCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Classify this error as a network-level failure.
    ///
    /// Walks the source chain of reqwest errors looking for the underlying
    /// `std::io::Error`, so refused and unreachable hosts can be told apart.
    pub fn transport_code(&self) -> Option<TransportCode> {
        match self {
            Self::Timeout { .. } => Some(TransportCode::TimedOut),
            Self::Api { status: 502, .. } => Some(TransportCode::BadGateway),
            Self::Transport(e) => {
                if e.is_timeout() {
                    return Some(TransportCode::TimedOut);
                }
                if e.status().map(|s| s.as_u16()) == Some(502) {
                    return Some(TransportCode::BadGateway);
                }
                if let Some(kind) = io_error_kind(e) {
                    match kind {
                        std::io::ErrorKind::ConnectionRefused => {
                            return Some(TransportCode::Refused);
                        }
                        std::io::ErrorKind::TimedOut => return Some(TransportCode::TimedOut),
                        std::io::ErrorKind::HostUnreachable
                        | std::io::ErrorKind::NetworkUnreachable
                        | std::io::ErrorKind::AddrNotAvailable => {
                            return Some(TransportCode::Unreachable);
                        }
                        _ => {}
                    }
                }
                if e.is_connect() {
                    Some(TransportCode::Unreachable)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Returns `true` for failures that mean the camera can no longer be
    /// reached (unreachable, refused, timeout, gateway error).
    pub fn is_network(&self) -> bool {
        self.transport_code().is_some()
    }

    /// Returns `true` for the transient upstream-gateway error the camera
    /// reports while its network stack is still coming up.
    pub fn is_bad_gateway(&self) -> bool {
        self.transport_code() == Some(TransportCode::BadGateway)
    }

    /// Short, serializable message for this error.
    ///
    /// For API errors this is the vendor message alone, without the
    /// status prefix.
    pub fn clean_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Transport(e) if e.is_timeout() => "request timed out".into(),
            Self::Transport(e) if e.is_connect() => "could not connect to camera".into(),
            other => other.to_string(),
        }
    }
}

fn io_error_kind(err: &reqwest::Error) -> Option<std::io::ErrorKind> {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = inner.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_502_is_bad_gateway() {
        let err = Error::Api {
            status: 502,
            message: "Bad Gateway".into(),
        };
        assert_eq!(err.transport_code(), Some(TransportCode::BadGateway));
        assert!(err.is_network());
        assert!(err.is_bad_gateway());
    }

    #[test]
    fn vendor_errors_are_not_network_class() {
        let err = Error::Api {
            status: 503,
            message: "Device busy".into(),
        };
        assert!(!err.is_network());
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.clean_message(), "Device busy");
    }

    #[test]
    fn timeout_variant_is_timed_out() {
        let err = Error::Timeout { timeout_ms: 5000 };
        assert_eq!(err.transport_code(), Some(TransportCode::TimedOut));
    }
}
