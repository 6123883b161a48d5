// SSDP datagram codec.
//
// Messages are HTTP-over-UDP: a start line followed by `Name: value`
// headers. Header names are case-insensitive on the wire, so they are
// stored lowercased.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};

pub const MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
pub const MULTICAST_PORT: u16 = 1900;

/// The SSDP multicast group and port.
pub const fn multicast_group() -> SocketAddrV4 {
    SocketAddrV4::new(MULTICAST_ADDR, MULTICAST_PORT)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Unsolicited `NOTIFY * HTTP/1.1` advertisement.
    Notify,
    /// `M-SEARCH * HTTP/1.1` query (usually our own, looped back).
    Search,
    /// Unicast reply to a search.
    Response { status: u16 },
}

/// `NTS` header of a NOTIFY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationSubtype {
    Alive,
    ByeBye,
    Update,
    Other(String),
}

impl NotificationSubtype {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ssdp:alive" => Self::Alive,
            "ssdp:byebye" => Self::ByeBye,
            "ssdp:update" => Self::Update,
            _ => Self::Other(raw.trim().to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsdpMessage {
    pub kind: MessageKind,
    headers: HashMap<String, String>,
}

impl SsdpMessage {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn usn(&self) -> Option<&str> {
        self.header("usn")
    }

    /// The advertised type: `NT` for notifications, `ST` for responses.
    pub fn notification_type(&self) -> Option<&str> {
        match self.kind {
            MessageKind::Response { .. } | MessageKind::Search => self.header("st"),
            MessageKind::Notify => self.header("nt"),
        }
    }

    pub fn subtype(&self) -> Option<NotificationSubtype> {
        self.header("nts").map(NotificationSubtype::parse)
    }

    /// NOTIFY ssdp:alive, or a successful search response.
    pub fn is_alive(&self) -> bool {
        match self.kind {
            MessageKind::Notify => self.subtype() == Some(NotificationSubtype::Alive),
            MessageKind::Response { status } => status == 200,
            MessageKind::Search => false,
        }
    }

    pub fn is_byebye(&self) -> bool {
        self.kind == MessageKind::Notify && self.subtype() == Some(NotificationSubtype::ByeBye)
    }
}

/// Parse one datagram. Returns `None` for anything that is not an SSDP
/// message; malformed header lines are skipped.
pub fn parse_message(datagram: &[u8]) -> Option<SsdpMessage> {
    let text = String::from_utf8_lossy(datagram);
    let mut lines = text.lines();
    let start = lines.next()?.trim();

    let kind = if start.starts_with("NOTIFY ") {
        MessageKind::Notify
    } else if start.starts_with("M-SEARCH ") {
        MessageKind::Search
    } else if start.starts_with("HTTP/1.") {
        let status = start.split_whitespace().nth(1)?.parse().ok()?;
        MessageKind::Response { status }
    } else {
        return None;
    };

    let mut headers = HashMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
    }

    Some(SsdpMessage { kind, headers })
}

/// Build an M-SEARCH datagram for one search target.
pub fn build_search(search_target: &str, mx: u8) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {MULTICAST_ADDR}:{MULTICAST_PORT}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {mx}\r\n\
         ST: {search_target}\r\n\
         \r\n"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALIVE: &str = "NOTIFY * HTTP/1.1\r\n\
        Host: 239.255.255.250:1900\r\n\
        Cache-Control: max-age=1800\r\n\
        Location: http://192.168.1.2:49152/upnp/CameraDevDesc.xml\r\n\
        nt: urn:schemas-canon-com:service:ICPO-CameraControlAPIService:1\r\n\
        NTS: ssdp:alive\r\n\
        USN: uuid:00000000-0000-0000-0001-60128B7C1F1D::urn:schemas-canon-com:service:ICPO-CameraControlAPIService:1\r\n\
        \r\n";

    #[test]
    fn parses_notify_with_mixed_case_headers() {
        let msg = parse_message(ALIVE.as_bytes()).unwrap();
        assert_eq!(msg.kind, MessageKind::Notify);
        assert!(msg.is_alive());
        assert!(!msg.is_byebye());
        assert_eq!(
            msg.location(),
            Some("http://192.168.1.2:49152/upnp/CameraDevDesc.xml")
        );
        assert_eq!(
            msg.header("NT"),
            Some("urn:schemas-canon-com:service:ICPO-CameraControlAPIService:1")
        );
    }

    #[test]
    fn parses_search_response() {
        let raw = "HTTP/1.1 200 OK\r\nST: upnp:rootdevice\r\nUSN: uuid:abc::upnp:rootdevice\r\n\r\n";
        let msg = parse_message(raw.as_bytes()).unwrap();
        assert_eq!(msg.kind, MessageKind::Response { status: 200 });
        assert_eq!(msg.notification_type(), Some("upnp:rootdevice"));
        assert!(msg.is_alive());
    }

    #[test]
    fn byebye_subtype() {
        let raw = "NOTIFY * HTTP/1.1\r\nNT: upnp:rootdevice\r\nNTS: ssdp:byebye\r\nUSN: uuid:abc\r\n\r\n";
        let msg = parse_message(raw.as_bytes()).unwrap();
        assert!(msg.is_byebye());
        assert!(!msg.is_alive());
    }

    #[test]
    fn rejects_non_ssdp_payloads() {
        assert!(parse_message(b"").is_none());
        assert!(parse_message(b"GET / HTTP/1.1\r\n\r\n").is_none());
        assert!(parse_message(b"HTTP/1.1 abc\r\n\r\n").is_none());
    }

    #[test]
    fn search_request_round_trips() {
        let raw = build_search("ssdp:all", 2);
        let msg = parse_message(raw.as_bytes()).unwrap();
        assert_eq!(msg.kind, MessageKind::Search);
        assert_eq!(msg.header("man"), Some("\"ssdp:discover\""));
        assert_eq!(msg.header("host"), Some("239.255.255.250:1900"));
        assert_eq!(msg.notification_type(), Some("ssdp:all"));
    }
}
