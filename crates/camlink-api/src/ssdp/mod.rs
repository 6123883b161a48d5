// SSDP discovery protocol: datagram codec, vendor filter and the
// device-description document.

pub mod description;
pub mod message;
pub mod vendor;

pub use description::{DeviceDescription, fetch_description, parse_description};
pub use message::{
    MULTICAST_ADDR, MULTICAST_PORT, MessageKind, NotificationSubtype, SsdpMessage, build_search,
    multicast_group, parse_message,
};
pub use vendor::{SERVICE_TYPES, is_vendor_manufacturer, matches_vendor, uuid_from_usn};
