// Events emitted by the state manager. Payloads carry identities and
// addresses; callers fetch full records through the manager's projections.

use std::net::SocketAddr;

use serde::Serialize;
use strum::Display;

use crate::error::CoreError;
use crate::model::{CameraStatus, DiscoveryMethod};

/// Why the primary camera stopped being primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DisconnectReason {
    /// Network-class failure: unreachable, refused, timeout, gateway error.
    ConnectionLost,
    /// The camera answered but reported a fault.
    DeviceError,
    /// Hot reconnect to a new address failed.
    ReconnectFailed,
    /// The camera announced it is leaving the network.
    Offline,
    UserRequested,
    /// Another camera, or a better record of the same one, took over.
    Replaced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManagerEvent {
    CameraRegistered {
        identity: String,
        address: SocketAddr,
        method: DiscoveryMethod,
    },
    CameraRemoved {
        identity: String,
        /// Record that superseded it during deduplication.
        replaced_by: Option<String>,
    },
    CameraIpChanged {
        identity: String,
        old: SocketAddr,
        new: SocketAddr,
    },
    PrimaryCameraChanged {
        identity: String,
        previous: Option<String>,
    },
    PrimaryCameraReconnected {
        identity: String,
        address: SocketAddr,
    },
    PrimaryCameraDisconnected {
        identity: String,
        reason: DisconnectReason,
        error: Option<String>,
    },
    CameraConnectionFailed {
        identity: String,
        error: CoreError,
    },
    CameraStatusChanged {
        identity: String,
        status: CameraStatus,
    },
}
