// Device status endpoints: information, battery, storage, temperature,
// date/time.

use std::time::Duration;

use tracing::debug;

use super::client::CcapiClient;
use super::models::{
    BatteryInfo, BatteryList, BatteryStatus, CameraDateTime, DeviceInformation, StorageInfo,
    Temperature,
};
use crate::error::Error;

pub const DEVICE_INFORMATION_PATH: &str = "/ccapi/ver100/deviceinformation";
pub const BATTERY_PATH: &str = "/ccapi/ver100/devicestatus/battery";
pub const BATTERY_LIST_PATH: &str = "/ccapi/ver110/devicestatus/batterylist";
pub const STORAGE_PATH: &str = "/ccapi/ver100/devicestatus/storage";
pub const TEMPERATURE_PATH: &str = "/ccapi/ver100/devicestatus/temperature";
pub const DATETIME_PATH: &str = "/ccapi/ver100/functions/datetime";

impl CcapiClient {
    pub async fn device_information(&self) -> Result<DeviceInformation, Error> {
        self.get(DEVICE_INFORMATION_PATH, self.timeout()).await
    }

    /// Battery status: the `ver110` battery list when the body supports it,
    /// otherwise the `ver100` single battery.
    ///
    /// Only a failure of the `ver100` fallback is returned; the list
    /// endpoint is absent on many bodies.
    pub async fn battery(&self) -> Result<BatteryStatus, Error> {
        match self.get::<BatteryList>(BATTERY_LIST_PATH, self.timeout()).await {
            Ok(list) if !list.batteries.is_empty() => {
                return Ok(BatteryStatus::List {
                    batteries: list.batteries,
                });
            }
            Ok(_) => debug!("battery list empty, falling back to ver100"),
            Err(e) if e.is_network() => return Err(e),
            Err(e) => debug!(error = %e, "battery list unavailable, falling back to ver100"),
        }
        let battery: BatteryInfo = self.get(BATTERY_PATH, self.timeout()).await?;
        Ok(BatteryStatus::Single { battery })
    }

    pub async fn storage(&self) -> Result<StorageInfo, Error> {
        self.get(STORAGE_PATH, self.timeout()).await
    }

    pub async fn temperature(&self) -> Result<Temperature, Error> {
        self.get(TEMPERATURE_PATH, self.timeout()).await
    }

    pub async fn datetime(&self) -> Result<CameraDateTime, Error> {
        self.get(DATETIME_PATH, self.timeout()).await
    }

    pub async fn set_datetime(&self, value: &CameraDateTime) -> Result<(), Error> {
        let _: serde_json::Value = self.put(DATETIME_PATH, value, self.timeout()).await?;
        Ok(())
    }

    /// Cheap liveness check used by health monitoring.
    pub async fn ping(&self, timeout: Duration) -> Result<(), Error> {
        let _: serde_json::Value = self.get(DEVICE_INFORMATION_PATH, timeout).await?;
        Ok(())
    }
}
