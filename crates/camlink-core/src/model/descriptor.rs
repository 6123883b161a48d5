// ── Device descriptor ──
//
// Immutable snapshot of one discovery. Identity comes from the
// advertisement's USN; only manually entered cameras get a synthesized
// `manual-<ip>-<port>` identity.

use std::net::{IpAddr, SocketAddr};

use camlink_api::ssdp::{DeviceDescription, is_vendor_manufacturer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

/// How a camera was found. Higher-priority methods win deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiscoveryMethod {
    /// SSDP advertisement or search response.
    Ssdp,
    /// Address entered by the user.
    Manual,
    /// Address found by probing a range.
    Scan,
}

impl DiscoveryMethod {
    /// Deduplication rank: `ssdp > manual > scan`.
    pub fn priority(self) -> u8 {
        match self {
            Self::Ssdp => 2,
            Self::Manual => 1,
            Self::Scan => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub uuid: String,
    pub ip: IpAddr,
    pub port: u16,
    /// CCAPI root, e.g. `https://192.168.1.2:443/ccapi`.
    pub control_url: Url,
    pub manufacturer: Option<String>,
    pub model_name: Option<String>,
    pub serial_number: Option<String>,
    pub nickname: Option<String>,
    pub friendly_name: Option<String>,
    /// Camera reports it is already paired with another client.
    pub on_service: bool,
    pub discovered_at: DateTime<Utc>,
    pub discovery_method: DiscoveryMethod,
}

impl DeviceDescriptor {
    /// Descriptor for an address entered by hand.
    pub fn manual(ip: IpAddr, port: u16) -> Result<Self, url::ParseError> {
        Self::at_address(format!("manual-{ip}-{port}"), ip, port, DiscoveryMethod::Manual)
    }

    /// Descriptor for an address found by probing.
    pub fn scanned(ip: IpAddr, port: u16) -> Result<Self, url::ParseError> {
        Self::at_address(format!("scan-{ip}-{port}"), ip, port, DiscoveryMethod::Scan)
    }

    fn at_address(
        uuid: String,
        ip: IpAddr,
        port: u16,
        method: DiscoveryMethod,
    ) -> Result<Self, url::ParseError> {
        let control_url = Url::parse(&format!("https://{}/ccapi", SocketAddr::new(ip, port)))?;
        Ok(Self {
            uuid,
            ip,
            port,
            control_url,
            manufacturer: None,
            model_name: None,
            serial_number: None,
            nickname: None,
            friendly_name: None,
            on_service: false,
            discovered_at: Utc::now(),
            discovery_method: method,
        })
    }

    /// Build from a parsed device description.
    ///
    /// Returns `None` when the description lacks a usable CCAPI access URL
    /// or does not name the vendor.
    pub fn from_description(uuid: &str, description: &DeviceDescription) -> Option<Self> {
        let manufacturer = description.manufacturer.as_deref()?;
        if !is_vendor_manufacturer(manufacturer) {
            return None;
        }
        let control_url = Url::parse(description.access_url.as_deref()?.trim()).ok()?;
        let ip: IpAddr = match control_url.host()? {
            url::Host::Ipv4(v4) => IpAddr::V4(v4),
            url::Host::Ipv6(v6) => IpAddr::V6(v6),
            url::Host::Domain(name) => name.parse().ok()?,
        };
        let port = control_url.port_or_known_default()?;

        Some(Self {
            uuid: uuid.to_owned(),
            ip,
            port,
            control_url: normalize_control_url(control_url),
            manufacturer: Some(manufacturer.to_owned()),
            model_name: description.model_name.clone(),
            serial_number: description.serial_number.clone(),
            nickname: description.nickname.clone(),
            friendly_name: description.friendly_name.clone(),
            on_service: description.on_service,
            discovered_at: Utc::now(),
            discovery_method: DiscoveryMethod::Ssdp,
        })
    }

    /// Same camera at a new address.
    pub fn with_address(&self, ip: IpAddr, port: u16) -> Self {
        let mut next = self.clone();
        next.ip = ip;
        next.port = port;
        // Both setters only fail for cannot-be-a-base URLs, which a
        // parsed http(s) control URL never is.
        let _ = next.control_url.set_ip_host(ip);
        let _ = next.control_url.set_port(Some(port));
        next
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Display label: nickname, then model, then identity.
    pub fn label(&self) -> &str {
        self.nickname
            .as_deref()
            .or(self.model_name.as_deref())
            .or(self.friendly_name.as_deref())
            .unwrap_or(&self.uuid)
    }

    /// Whether `other` describes the same advertisement, ignoring the
    /// discovery timestamp.
    pub fn same_advertisement(&self, other: &Self) -> bool {
        Self {
            discovered_at: other.discovered_at,
            ..self.clone()
        } == *other
    }

    /// Whether two descriptors are the same physical camera: matching
    /// serial numbers, or the same address with agreeing vendor and model.
    pub fn same_device(&self, other: &Self) -> bool {
        let serials = (
            non_empty(self.serial_number.as_deref()),
            non_empty(other.serial_number.as_deref()),
        );
        if let (Some(a), Some(b)) = serials {
            return a.eq_ignore_ascii_case(b);
        }
        self.address() == other.address()
            && markers_agree(self.manufacturer.as_deref(), other.manufacturer.as_deref())
            && markers_agree(self.model_name.as_deref(), other.model_name.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Missing markers never disagree.
fn markers_agree(a: Option<&str>, b: Option<&str>) -> bool {
    match (non_empty(a), non_empty(b)) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => true,
    }
}

/// Drop the trailing slash the camera advertises (`.../ccapi/`) so the
/// root is requested as `/ccapi`.
fn normalize_control_url(mut url: Url) -> Url {
    let trimmed = url.path().trim_end_matches('/').to_owned();
    if !trimmed.is_empty() {
        url.set_path(&trimmed);
    }
    url
}
