// ── SSDP discovery ──
//
// Finds CCAPI cameras without knowing their address. The listener owns one
// UDP socket joined to the SSDP group and fans results out as
// `DiscoveryEvent`s.

mod listener;

pub use listener::DiscoveryListener;

use serde::Serialize;

use crate::model::DeviceDescriptor;

/// Broadcast by [`DiscoveryListener`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscoveryEvent {
    /// A camera advertised itself and its description resolved.
    CameraDiscovered { descriptor: Box<DeviceDescriptor> },
    /// A known camera sent `ssdp:byebye`.
    DeviceOffline { uuid: String },
}
