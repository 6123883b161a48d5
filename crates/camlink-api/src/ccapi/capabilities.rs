// ── CCAPI capability map ──
//
// The CCAPI root returns `{ "ver100": [ {path, get, post, put, delete}, ... ],
// "ver110": [...] }`. Entries are validated into `EndpointDescriptor`s once;
// callers query the map through pure selection functions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const SHUTTER_REGULAR_SUFFIX: &str = "shooting/control/shutterbutton";
const SHUTTER_MANUAL_SUFFIX: &str = "shooting/control/shutterbutton/manual";

/// One endpoint listed by the camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub path: String,
    #[serde(default)]
    pub get: bool,
    #[serde(default)]
    pub post: bool,
    #[serde(default)]
    pub put: bool,
    #[serde(default)]
    pub delete: bool,
}

/// Validated capability map, keyed by API version (`ver100`, `ver110`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    versions: BTreeMap<String, Vec<EndpointDescriptor>>,
}

/// Which shutter-control variant an endpoint implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutterKind {
    /// Press auto-releases; payload `{"af": bool}`.
    Regular,
    /// Explicit press/release; payload `{"af": bool, "action": ...}`.
    Manual,
}

/// The shutter endpoint selected for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutterEndpoint {
    pub path: String,
    pub kind: ShutterKind,
}

impl ShutterEndpoint {
    /// Body for a full press.
    pub fn press_payload(&self, use_autofocus: bool) -> Value {
        match self.kind {
            ShutterKind::Regular => serde_json::json!({ "af": use_autofocus }),
            ShutterKind::Manual => serde_json::json!({
                "af": use_autofocus,
                "action": "full_press",
            }),
        }
    }

    /// Body for a release, or `None` when the endpoint releases on its own.
    pub fn release_payload(&self) -> Option<Value> {
        match self.kind {
            ShutterKind::Regular => None,
            ShutterKind::Manual => Some(serde_json::json!({
                "af": false,
                "action": "release",
            })),
        }
    }
}

impl Capabilities {
    /// Build from the raw CCAPI root document.
    ///
    /// Non-array version entries and endpoint objects without a `path`
    /// are skipped rather than rejected.
    pub fn from_value(raw: &Value) -> Self {
        let mut versions = BTreeMap::new();
        if let Some(map) = raw.as_object() {
            for (version, list) in map {
                let Some(items) = list.as_array() else {
                    continue;
                };
                let endpoints: Vec<EndpointDescriptor> = items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .filter(|e: &EndpointDescriptor| !e.path.is_empty())
                    .collect();
                versions.insert(version.clone(), endpoints);
            }
        }
        Self { versions }
    }

    /// Build directly from endpoint descriptors under one version key.
    pub fn from_endpoints(version: &str, endpoints: Vec<EndpointDescriptor>) -> Self {
        let mut versions = BTreeMap::new();
        versions.insert(version.to_owned(), endpoints);
        Self { versions }
    }

    /// API versions the camera advertises, in ascending order.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// All endpoints across versions.
    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.versions.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.versions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an endpoint with exactly this path is listed.
    pub fn has_path(&self, path: &str) -> bool {
        self.endpoints().any(|e| e.path == path)
    }

    /// Select the shutter endpoint for this camera.
    pub fn shutter_endpoint(&self) -> Option<ShutterEndpoint> {
        select_shutter_endpoint(self.endpoints())
    }
}

/// Pick a shutter-control endpoint, preferring the regular (auto-release)
/// path over the manual (press/release) one. Only POST-capable entries
/// qualify.
pub fn select_shutter_endpoint<'a>(
    endpoints: impl IntoIterator<Item = &'a EndpointDescriptor>,
) -> Option<ShutterEndpoint> {
    let mut manual = None;
    for endpoint in endpoints {
        if !endpoint.post {
            continue;
        }
        let path = endpoint.path.trim_end_matches('/');
        if path.ends_with(SHUTTER_MANUAL_SUFFIX) {
            if manual.is_none() {
                manual = Some(path.to_owned());
            }
        } else if path.ends_with(SHUTTER_REGULAR_SUFFIX) {
            return Some(ShutterEndpoint {
                path: path.to_owned(),
                kind: ShutterKind::Regular,
            });
        }
    }
    manual.map(|path| ShutterEndpoint {
        path,
        kind: ShutterKind::Manual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root() -> Value {
        json!({
            "ver100": [
                { "path": "/ccapi/ver100/deviceinformation", "get": true, "post": false, "put": false, "delete": false },
                { "path": "/ccapi/ver100/shooting/control/shutterbutton/manual", "get": false, "post": true, "put": false, "delete": false },
                { "path": "/ccapi/ver100/shooting/control/shutterbutton", "get": false, "post": true, "put": false, "delete": false },
                { "get": true }
            ],
            "ver110": [
                { "path": "/ccapi/ver110/devicestatus/batterylist", "get": true, "post": false, "put": false, "delete": false }
            ],
            "topics": "not-a-list"
        })
    }

    #[test]
    fn regular_endpoint_preferred_over_manual() {
        let caps = Capabilities::from_value(&root());
        let shutter = caps.shutter_endpoint().expect("shutter endpoint");
        assert_eq!(shutter.kind, ShutterKind::Regular);
        assert_eq!(shutter.path, "/ccapi/ver100/shooting/control/shutterbutton");
    }

    #[test]
    fn manual_endpoint_used_when_only_option() {
        let caps = Capabilities::from_endpoints(
            "ver100",
            vec![EndpointDescriptor {
                path: "/ccapi/ver100/shooting/control/shutterbutton/manual".into(),
                get: false,
                post: true,
                put: false,
                delete: false,
            }],
        );
        let shutter = caps.shutter_endpoint().expect("shutter endpoint");
        assert_eq!(shutter.kind, ShutterKind::Manual);
        assert_eq!(
            shutter.release_payload(),
            Some(json!({ "af": false, "action": "release" }))
        );
    }

    #[test]
    fn endpoints_without_post_are_ignored() {
        let caps = Capabilities::from_endpoints(
            "ver100",
            vec![EndpointDescriptor {
                path: "/ccapi/ver100/shooting/control/shutterbutton".into(),
                get: true,
                post: false,
                put: false,
                delete: false,
            }],
        );
        assert!(caps.shutter_endpoint().is_none());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let caps = Capabilities::from_value(&root());
        assert_eq!(caps.len(), 4);
        assert_eq!(caps.versions().collect::<Vec<_>>(), vec!["ver100", "ver110"]);
        assert!(caps.has_path("/ccapi/ver110/devicestatus/batterylist"));
    }

    #[test]
    fn press_payloads_follow_endpoint_kind() {
        let regular = ShutterEndpoint {
            path: "/ccapi/ver100/shooting/control/shutterbutton".into(),
            kind: ShutterKind::Regular,
        };
        assert_eq!(regular.press_payload(false), json!({ "af": false }));
        assert!(regular.release_payload().is_none());

        let manual = ShutterEndpoint {
            path: "/ccapi/ver100/shooting/control/shutterbutton/manual".into(),
            kind: ShutterKind::Manual,
        };
        assert_eq!(
            manual.press_payload(true),
            json!({ "af": true, "action": "full_press" })
        );
    }
}
