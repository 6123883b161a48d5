use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a camera record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CameraStatus {
    Discovered,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Offline,
}

impl CameraStatus {
    /// Statuses in which a record owns a controller.
    pub fn has_controller(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

/// Connection state of one controller session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}
