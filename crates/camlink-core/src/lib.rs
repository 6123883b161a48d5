//! Camera discovery, control and state management for Canon CCAPI cameras.
//!
//! This crate owns the business logic between the wire layer in
//! `camlink-api` and front ends such as the `camlink` CLI:
//!
//! - **[`DiscoveryListener`]**: SSDP multicast listener. Joins the group on
//!   every usable interface, searches periodically, resolves vendor
//!   advertisements into [`DeviceDescriptor`]s and broadcasts
//!   [`DiscoveryEvent`]s.
//!
//! - **[`CameraController`]**: one camera's HTTPS control session.
//!   [`initialize()`](CameraController::initialize) fetches the capability
//!   map, selects the shutter endpoint, then spawns a health heartbeat and a
//!   settings poll. Network-class failures are reported once per
//!   connected -> disconnected transition.
//!
//! - **[`CameraStateManager`]**: the single registry of known cameras.
//!   Deduplicates records (`ssdp > manual > scan`), keeps at most one
//!   primary camera, follows IP changes of the primary with one hot
//!   reconnect and keeps a capped connection history.
//!
//! - **Domain model** ([`model`]): descriptors, statuses, history entries and
//!   read-only projections, all serializable.

pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod model;
pub mod persistence;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControllerConfig, DiscoveryConfig, ManagerConfig, TlsVerification};
pub use controller::{
    CameraController, CameraDateTimeDetails, ConnectionStatus, ControllerStatusUpdate,
    HealthOutcome, IntervalValidation, StatusSink, SupervisionPause,
};
pub use discovery::{DiscoveryEvent, DiscoveryListener};
pub use error::{CameraFault, CoreError};
pub use manager::{CameraStateManager, DisconnectReason, ManagerEvent, RegisterOutcome};
pub use persistence::{LastIpStore, MemoryLastIpStore};

pub use model::{
    CameraStatus, CameraSummary, ConnectionHistoryEntry, ConnectionState, DeviceDescriptor,
    DiscoveryMethod, DiscoveryStatus, HistoryEvent, InterfaceKind, NetworkInterface,
};
