// Shooting endpoints: settings and shutter control.

use std::time::Duration;

use serde_json::Value;

use super::capabilities::ShutterEndpoint;
use super::client::CcapiClient;
use super::models::ShootingSettings;
use crate::error::Error;

pub const SHOOTING_SETTINGS_PATH: &str = "/ccapi/ver100/shooting/settings";

impl CcapiClient {
    pub async fn shooting_settings(&self, timeout: Duration) -> Result<ShootingSettings, Error> {
        self.get(SHOOTING_SETTINGS_PATH, timeout).await
    }

    /// PUT `{"value": value}` to `shooting/settings/<name>`. Returns the
    /// camera's echo of the new value.
    pub async fn update_shooting_setting(&self, name: &str, value: &Value) -> Result<Value, Error> {
        if name.is_empty() || name.contains('/') {
            return Err(Error::Api {
                status: 400,
                message: format!("invalid setting name: {name:?}"),
            });
        }
        let path = format!("{SHOOTING_SETTINGS_PATH}/{name}");
        let body = serde_json::json!({ "value": value });
        self.put(&path, &body, self.timeout()).await
    }

    /// POST a full press to the shutter endpoint.
    pub async fn press_shutter(
        &self,
        endpoint: &ShutterEndpoint,
        use_autofocus: bool,
        timeout: Duration,
    ) -> Result<(), Error> {
        let body = endpoint.press_payload(use_autofocus);
        let _: Value = self.post(&endpoint.path, &body, timeout).await?;
        Ok(())
    }

    /// POST a release. A no-op for endpoints that release on their own.
    pub async fn release_shutter(
        &self,
        endpoint: &ShutterEndpoint,
        timeout: Duration,
    ) -> Result<(), Error> {
        let Some(body) = endpoint.release_payload() else {
            return Ok(());
        };
        let _: Value = self.post(&endpoint.path, &body, timeout).await?;
        Ok(())
    }
}
