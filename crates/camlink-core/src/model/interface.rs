// ── Local network interfaces ──
//
// Enumeration happens outside the core; discovery only ranks what it is
// given to decide multicast join order.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub ipv4: Ipv4Addr,
}

impl NetworkInterface {
    pub fn new(name: impl Into<String>, ipv4: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            ipv4,
        }
    }

    pub fn kind(&self) -> InterfaceKind {
        let name = self.name.to_ascii_lowercase();
        if name.starts_with("ap") || name.starts_with("uap") || name.contains("hotspot") {
            InterfaceKind::AccessPoint
        } else if name.starts_with("wl") || name.starts_with("wifi") {
            InterfaceKind::WifiClient
        } else {
            InterfaceKind::Other
        }
    }
}

/// Join priority, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InterfaceKind {
    /// Host-run access point the camera joins directly.
    AccessPoint,
    /// Host connected to a WiFi network as a client.
    WifiClient,
    Other,
}

/// Usable interfaces, access point first, WiFi client second, others last.
/// Loopback and unspecified addresses are dropped.
pub fn rank_interfaces(interfaces: &[NetworkInterface]) -> Vec<NetworkInterface> {
    let mut usable: Vec<NetworkInterface> = interfaces
        .iter()
        .filter(|i| !i.ipv4.is_loopback() && !i.ipv4.is_unspecified())
        .cloned()
        .collect();
    usable.sort_by_key(NetworkInterface::kind);
    usable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_ap_then_wifi_then_others() {
        let ranked = rank_interfaces(&[
            NetworkInterface::new("eth0", Ipv4Addr::new(192, 168, 0, 10)),
            NetworkInterface::new("lo", Ipv4Addr::LOCALHOST),
            NetworkInterface::new("wlan0", Ipv4Addr::new(10, 0, 0, 7)),
            NetworkInterface::new("ap0", Ipv4Addr::new(192, 168, 4, 1)),
        ]);
        let names: Vec<&str> = ranked.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ap0", "wlan0", "eth0"]);
    }
}
