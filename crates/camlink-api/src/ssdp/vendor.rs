// Canon identifiers used to filter SSDP traffic.

/// Search targets sent in M-SEARCH, one datagram each.
pub const SERVICE_TYPES: &[&str] = &[
    "urn:schemas-canon-com:service:ICPO-CameraControlAPIService:1",
    "urn:schemas-canon-com:device:ICPO-CameraControlAPIDevice:1",
];

pub const ROOT_DEVICE: &str = "upnp:rootdevice";

/// Substrings that identify a Canon USN when the type is generic.
const USN_MARKERS: &[&str] = &["canon", "icpo"];

/// Vendor names accepted in the description's `manufacturer`.
const MANUFACTURER_MARKERS: &[&str] = &["canon"];

/// Whether an advertisement's type/USN pair belongs to a CCAPI camera.
///
/// `upnp:rootdevice` is accepted only when the USN itself carries a vendor
/// marker.
pub fn matches_vendor(notification_type: Option<&str>, usn: Option<&str>) -> bool {
    let nt = notification_type.unwrap_or_default();
    let usn = usn.unwrap_or_default();

    if SERVICE_TYPES
        .iter()
        .any(|st| nt.contains(st) || usn.contains(st))
    {
        return true;
    }

    if nt.contains(ROOT_DEVICE) {
        let usn = usn.to_ascii_lowercase();
        return USN_MARKERS.iter().any(|m| usn.contains(m));
    }

    false
}

/// Whether a description's manufacturer names the vendor.
pub fn is_vendor_manufacturer(manufacturer: &str) -> bool {
    let lower = manufacturer.to_ascii_lowercase();
    MANUFACTURER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Device identity from a USN: the part between `uuid:` and `::`.
pub fn uuid_from_usn(usn: &str) -> Option<String> {
    let usn = usn.trim();
    let rest = usn
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("uuid:"))
        .map_or(usn, |_| &usn[5..]);
    let id = rest.split("::").next().unwrap_or_default().trim();
    (!id.is_empty()).then(|| id.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_matches() {
        assert!(matches_vendor(
            Some("urn:schemas-canon-com:service:ICPO-CameraControlAPIService:1"),
            Some("uuid:1234::urn:schemas-canon-com:service:ICPO-CameraControlAPIService:1"),
        ));
    }

    #[test]
    fn rootdevice_needs_vendor_marker() {
        assert!(matches_vendor(
            Some("upnp:rootdevice"),
            Some("uuid:00000000-0000-0000-0001-60128B7C1F1D::upnp:rootdevice::ICPO"),
        ));
        assert!(!matches_vendor(
            Some("upnp:rootdevice"),
            Some("uuid:5f9ec1b3-ed59-1900-4530-00a0c9a1c2f0::upnp:rootdevice"),
        ));
    }

    #[test]
    fn unrelated_types_rejected() {
        assert!(!matches_vendor(
            Some("urn:schemas-upnp-org:device:MediaRenderer:1"),
            Some("uuid:abc::urn:schemas-upnp-org:device:MediaRenderer:1"),
        ));
        assert!(!matches_vendor(None, None));
    }

    #[test]
    fn usn_identity_extraction() {
        assert_eq!(
            uuid_from_usn("uuid:00000000-0000-0000-0001-60128B7C1F1D::upnp:rootdevice").as_deref(),
            Some("00000000-0000-0000-0001-60128B7C1F1D")
        );
        assert_eq!(uuid_from_usn("UUID:abc").as_deref(), Some("abc"));
        assert_eq!(uuid_from_usn("uuid:"), None);
    }

    #[test]
    fn manufacturer_check_is_case_insensitive() {
        assert!(is_vendor_manufacturer("Canon Inc."));
        assert!(is_vendor_manufacturer("CANON"));
        assert!(!is_vendor_manufacturer("Nikon"));
    }
}
