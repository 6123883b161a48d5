pub mod descriptor;
pub mod history;
pub mod interface;
pub mod record;
pub mod status;

pub use descriptor::{DeviceDescriptor, DiscoveryMethod};
pub use history::{ConnectionHistory, ConnectionHistoryEntry, HistoryEvent};
pub use interface::{InterfaceKind, NetworkInterface, rank_interfaces};
pub use record::{CameraSummary, DiscoveryStatus};
pub use status::{CameraStatus, ConnectionState};
