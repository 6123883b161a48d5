// CCAPI response types
//
// Field names follow the camera's JSON. Unknown fields are kept in `extra`
// so newer firmware does not break deserialization.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response from `GET /ccapi/ver100/deviceinformation`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInformation {
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default, rename = "productname")]
    pub product_name: Option<String>,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default, rename = "serialnumber")]
    pub serial_number: Option<String>,
    #[serde(default, rename = "macaddress")]
    pub mac_address: Option<String>,
    #[serde(default, rename = "firmwareversion")]
    pub firmware_version: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// One battery pack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryInfo {
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    /// `"full"`, `"high"`, `"half"`, `"quarter"`, `"low"`, or a percentage.
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Response from `GET /ccapi/ver110/devicestatus/batterylist`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryList {
    #[serde(default, rename = "batterylist")]
    pub batteries: Vec<BatteryInfo>,
}

/// Battery status, from whichever endpoint the camera supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum BatteryStatus {
    /// `ver110` list (grip-aware bodies).
    List { batteries: Vec<BatteryInfo> },
    /// `ver100` single battery.
    Single { battery: BatteryInfo },
}

impl BatteryStatus {
    /// The first battery reported, if any.
    pub fn primary(&self) -> Option<&BatteryInfo> {
        match self {
            Self::List { batteries } => batteries.first(),
            Self::Single { battery } => Some(battery),
        }
    }
}

/// One storage slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSlot {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub accesscapability: Option<String>,
    #[serde(default, rename = "maxsize")]
    pub max_size: Option<u64>,
    #[serde(default, rename = "spacesize")]
    pub space_size: Option<u64>,
    #[serde(default, rename = "contentsnumber")]
    pub contents_number: Option<u64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Response from `GET /ccapi/ver100/devicestatus/storage`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    #[serde(default, rename = "storagelist")]
    pub storages: Vec<StorageSlot>,
}

/// Response from `GET /ccapi/ver100/devicestatus/temperature`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    /// `"normal"`, `"warning"`, `"frameratedown"`, `"disableliveview"`, ...
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `GET`/`PUT /ccapi/ver100/functions/datetime`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDateTime {
    /// RFC1123-style, e.g. `"Tue, 01 Jan 2019 00:00:00 +0900"`.
    pub datetime: String,
    pub dst: bool,
}

/// Response from `GET /ccapi/ver100/shooting/settings`.
///
/// Each key maps to `{"value": ..., "ability": [...]}`. The shape varies
/// by body and mode, so the map is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShootingSettings(pub Map<String, Value>);

impl ShootingSettings {
    /// Current value of a named setting.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.0.get(name).and_then(|entry| entry.get("value"))
    }

    /// Allowed values for a named setting, when the camera lists them.
    pub fn ability(&self, name: &str) -> Option<&Vec<Value>> {
        self.0
            .get(name)
            .and_then(|entry| entry.get("ability"))
            .and_then(Value::as_array)
    }

    /// The shutter speed (`tv`) as the camera reports it.
    pub fn shutter_speed(&self) -> Option<&str> {
        self.value("tv").and_then(Value::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shooting_settings_accessors() {
        let settings: ShootingSettings = serde_json::from_value(json!({
            "tv": { "value": "1/125", "ability": ["1/60", "1/125"] },
            "av": { "value": "f5.6", "ability": [] }
        }))
        .unwrap();
        assert_eq!(settings.shutter_speed(), Some("1/125"));
        assert_eq!(settings.ability("tv").map(Vec::len), Some(2));
        assert!(settings.value("iso").is_none());
    }

    #[test]
    fn device_information_keeps_unknown_fields() {
        let info: DeviceInformation = serde_json::from_value(json!({
            "manufacturer": "Canon Inc.",
            "productname": "Canon EOS R50",
            "serialnumber": "012345678901",
            "newfield": 1
        }))
        .unwrap();
        assert_eq!(info.serial_number.as_deref(), Some("012345678901"));
        assert!(info.extra.contains_key("newfield"));
    }
}
