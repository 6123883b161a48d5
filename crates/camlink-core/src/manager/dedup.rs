// Deduplication of camera records.
//
// One physical camera can reach the registry under several identities: an
// SSDP advertisement, an address typed in by the user, a scan hit. The
// record found by the highest-priority method survives.

use crate::model::DeviceDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupDecision {
    /// No other record describes this camera.
    Unique,
    /// The candidate wins; these records must be torn down and removed.
    Replace(Vec<String>),
    /// An existing record of equal or higher priority describes this camera.
    Reject { existing: String },
}

/// Compare `candidate` against every other known descriptor.
///
/// Strictly higher priority wins; ties keep the existing record.
pub fn resolve<'a, I>(candidate: &DeviceDescriptor, known: I) -> DedupDecision
where
    I: IntoIterator<Item = &'a DeviceDescriptor>,
{
    let rank = candidate.discovery_method.priority();
    let mut losers = Vec::new();

    for other in known {
        if other.uuid == candidate.uuid || !candidate.same_device(other) {
            continue;
        }
        if rank > other.discovery_method.priority() {
            losers.push(other.uuid.clone());
        } else {
            return DedupDecision::Reject {
                existing: other.uuid.clone(),
            };
        }
    }

    if losers.is_empty() {
        DedupDecision::Unique
    } else {
        losers.sort();
        DedupDecision::Replace(losers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DiscoveryMethod;

    fn manual(serial: Option<&str>) -> DeviceDescriptor {
        let mut d = DeviceDescriptor::manual("10.0.0.5".parse().unwrap(), 443).unwrap();
        d.serial_number = serial.map(str::to_owned);
        d
    }

    fn ssdp(uuid: &str, serial: &str) -> DeviceDescriptor {
        let mut d = DeviceDescriptor::manual("10.0.0.7".parse().unwrap(), 443).unwrap();
        d.uuid = uuid.into();
        d.serial_number = Some(serial.into());
        d.discovery_method = DiscoveryMethod::Ssdp;
        d
    }

    #[test]
    fn ssdp_replaces_manual_with_same_serial() {
        let existing = manual(Some("123"));
        let decision = resolve(&ssdp("cam", "123"), [&existing]);
        assert_eq!(decision, DedupDecision::Replace(vec![existing.uuid]));
    }

    #[test]
    fn manual_is_rejected_against_ssdp() {
        let existing = ssdp("cam", "123");
        let decision = resolve(&manual(Some("123")), [&existing]);
        assert_eq!(
            decision,
            DedupDecision::Reject {
                existing: "cam".into()
            }
        );
    }

    #[test]
    fn tie_keeps_existing() {
        let existing = ssdp("cam-a", "123");
        let decision = resolve(&ssdp("cam-b", "123"), [&existing]);
        assert!(matches!(decision, DedupDecision::Reject { .. }));
    }

    #[test]
    fn same_identity_and_other_devices_are_ignored() {
        let same = ssdp("cam", "123");
        let other = ssdp("cam-2", "999");
        assert_eq!(resolve(&ssdp("cam", "123"), [&same, &other]), DedupDecision::Unique);
    }

    #[test]
    fn scan_loses_to_manual_at_same_address() {
        let mut scanned = DeviceDescriptor::scanned("10.0.0.5".parse().unwrap(), 443).unwrap();
        scanned.serial_number = None;
        let decision = resolve(&manual(None), [&scanned]);
        assert_eq!(decision, DedupDecision::Replace(vec![scanned.uuid]));
    }
}
