// Canon Camera Control API (CCAPI) over HTTPS.

pub mod capabilities;
pub mod client;
pub mod datetime;
pub mod device;
pub mod events;
pub mod exposure;
pub mod models;
pub mod shooting;

pub use capabilities::{
    Capabilities, EndpointDescriptor, ShutterEndpoint, ShutterKind, select_shutter_endpoint,
};
pub use client::CcapiClient;
pub use datetime::{ZoneOffsets, format_camera_datetime, parse_camera_datetime, standard_offset};
pub use events::{CameraEvents, PollWait};
pub use exposure::parse_shutter_speed;
pub use models::{
    BatteryInfo, BatteryStatus, CameraDateTime, DeviceInformation, ShootingSettings, StorageInfo,
    StorageSlot, Temperature,
};
