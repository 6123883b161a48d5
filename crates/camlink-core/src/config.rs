// ── Runtime configuration ──
//
// These types describe how discovery, controllers and the state manager
// behave. They never touch disk: camlink-config (or a test) builds them
// and hands them in.

use std::net::SocketAddr;
use std::time::Duration;

use camlink_api::{TlsMode, TransportConfig};

/// TLS verification strategy for the camera's HTTPS endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Cameras ship self-signed certificates.
    #[default]
    DangerAcceptInvalid,
}

/// Settings for one camera controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub tls: TlsVerification,
    /// Default per-request timeout.
    pub request_timeout: Duration,
    /// Shutter press timeout; long enough to cover slow exposures.
    pub press_timeout: Duration,
    pub release_timeout: Duration,
    /// Pause between press and release in `take_photo`.
    pub shutter_settle: Duration,
    /// Extra attempts after a gateway error during connect.
    pub max_connect_retries: u32,
    pub gateway_retry_delay: Duration,
    /// Health heartbeat period. Zero disables the task.
    pub health_check_interval: Duration,
    /// Consecutive heartbeat failures before the controller disconnects.
    pub max_consecutive_failures: u32,
    /// Settings refresh period. Zero disables the task.
    pub info_poll_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tls: TlsVerification::default(),
            request_timeout: Duration::from_secs(5),
            press_timeout: Duration::from_secs(35),
            release_timeout: Duration::from_secs(10),
            shutter_settle: Duration::from_millis(200),
            max_connect_retries: 3,
            gateway_retry_delay: Duration::from_secs(2),
            health_check_interval: Duration::from_secs(10),
            max_consecutive_failures: 3,
            info_poll_interval: Duration::from_secs(30),
        }
    }
}

impl ControllerConfig {
    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.request_timeout,
            connect_timeout: self.request_timeout,
        }
    }
}

/// Settings for the SSDP discovery listener.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Local UDP port to bind. 1900 receives unsolicited NOTIFYs.
    pub bind_port: u16,
    /// Period between active M-SEARCH rounds.
    pub search_interval: Duration,
    /// `MX` header value: seconds devices may wait before replying.
    pub search_mx: u8,
    /// Where M-SEARCH requests are sent. The SSDP multicast group unless a
    /// single device is queried by unicast.
    pub search_target: SocketAddr,
    /// Timeout for fetching a device-description document.
    pub description_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bind_port: camlink_api::ssdp::MULTICAST_PORT,
            search_interval: Duration::from_secs(60),
            search_mx: 2,
            search_target: SocketAddr::V4(camlink_api::ssdp::multicast_group()),
            description_timeout: Duration::from_secs(3),
        }
    }
}

/// Settings for the camera state manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub controller: ControllerConfig,
    /// History entries kept per camera.
    pub history_limit: usize,
    /// Apply the auto-connect policy on registration.
    pub auto_connect: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            history_limit: 10,
            auto_connect: true,
        }
    }
}
