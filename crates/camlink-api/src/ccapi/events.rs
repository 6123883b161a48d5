// Event polling. The camera holds a `timeout=long` request open until a
// property changes or roughly 30 seconds pass, then answers with the
// changed properties (`{}` when nothing changed).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::client::CcapiClient;
use crate::error::Error;

pub const EVENT_POLLING_PATH: &str = "/ccapi/ver110/event/polling";

/// How long the camera may hold a polling request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PollWait {
    /// Wait for a change, up to the camera's long-poll limit.
    #[default]
    Long,
    /// Answer at once with whatever changed since the last poll.
    Immediately,
}

impl PollWait {
    pub fn as_query(self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Immediately => "immediately",
        }
    }
}

/// Properties that changed since the previous poll, keyed by CCAPI name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraEvents {
    pub changes: serde_json::Map<String, serde_json::Value>,
}

impl CameraEvents {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Names of the changed properties.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }
}

impl CcapiClient {
    /// One event poll. `timeout` must outlast the camera's own wait for
    /// [`PollWait::Long`].
    pub async fn poll_events(
        &self,
        wait: PollWait,
        timeout: Duration,
    ) -> Result<CameraEvents, Error> {
        let path = format!("{EVENT_POLLING_PATH}?timeout={}", wait.as_query());
        let changes: Option<serde_json::Map<String, serde_json::Value>> =
            self.get(&path, timeout).await?;
        Ok(CameraEvents {
            changes: changes.unwrap_or_default(),
        })
    }
}
