// camlink-api: Async Rust client for Canon CCAPI cameras and their SSDP
// advertisements.

pub mod ccapi;
pub mod error;
pub mod ssdp;
pub mod transport;

pub use ccapi::CcapiClient;
pub use error::{Error, TransportCode};
pub use transport::{TlsMode, TransportConfig};
