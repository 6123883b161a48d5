// Registry storage. Only `CameraStateManager` touches it, always under its
// mutex.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::controller::CameraController;
use crate::model::{CameraStatus, CameraSummary, ConnectionHistory, DeviceDescriptor};

pub(crate) struct CameraRecord {
    pub descriptor: DeviceDescriptor,
    pub status: CameraStatus,
    /// Present only while connected. A connect in flight holds its
    /// controller outside the registry until it commits.
    pub controller: Option<CameraController>,
    pub last_error: Option<String>,
    /// Also identifies the connect attempt in flight.
    pub connection_attempts: u32,
    pub last_seen: DateTime<Utc>,
}

impl CameraRecord {
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            status: CameraStatus::Discovered,
            controller: None,
            last_error: None,
            connection_attempts: 0,
            last_seen: Utc::now(),
        }
    }

    pub fn summary(&self, primary: Option<&str>) -> CameraSummary {
        CameraSummary {
            identity: self.descriptor.uuid.clone(),
            descriptor: self.descriptor.clone(),
            status: self.status,
            is_primary: primary == Some(self.descriptor.uuid.as_str()),
            last_error: self.last_error.clone(),
            connection_attempts: self.connection_attempts,
            last_seen: self.last_seen,
        }
    }
}

pub(crate) struct Registry {
    pub records: HashMap<String, CameraRecord>,
    /// Identity of the primary camera. Never stored on the record.
    pub primary: Option<String>,
    pub history: ConnectionHistory,
}

impl Registry {
    pub fn new(history_limit: usize) -> Self {
        Self {
            records: HashMap::new(),
            primary: None,
            history: ConnectionHistory::new(history_limit),
        }
    }

    pub fn is_primary(&self, identity: &str) -> bool {
        self.primary.as_deref() == Some(identity)
    }

    pub fn summaries(&self) -> Vec<CameraSummary> {
        let mut all: Vec<CameraSummary> = self
            .records
            .values()
            .map(|r| r.summary(self.primary.as_deref()))
            .collect();
        all.sort_by(|a, b| a.identity.cmp(&b.identity));
        all
    }
}
