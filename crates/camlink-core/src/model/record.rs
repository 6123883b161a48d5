// Read-only projections handed to callers of the state manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::descriptor::DeviceDescriptor;
use super::status::CameraStatus;

/// Snapshot of one camera record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSummary {
    pub identity: String,
    pub descriptor: DeviceDescriptor,
    pub status: CameraStatus,
    pub is_primary: bool,
    pub last_error: Option<String>,
    pub connection_attempts: u32,
    pub last_seen: DateTime<Utc>,
}

/// Aggregate discovery/registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryStatus {
    /// Whether an attached discovery listener is running.
    pub discovery_running: bool,
    /// Devices currently in the listener's cache.
    pub discovered_devices: usize,
    /// Records in the registry.
    pub known_cameras: usize,
    pub primary: Option<String>,
    pub last_successful_ip: Option<String>,
}
