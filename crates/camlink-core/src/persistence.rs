// ── Last successful IP ──
//
// The state manager remembers the address of the last camera it connected
// to so a camera that reappears there is reconnected automatically. The
// storage format belongs to the embedding application.

use std::sync::{Mutex, PoisonError};

/// Single-value store for the last successful camera IP.
pub trait LastIpStore: Send + Sync {
    fn record(&self, ip: &str);
    fn read(&self) -> Option<String>;
}

/// Process-local store; forgets on exit.
#[derive(Debug, Default)]
pub struct MemoryLastIpStore {
    value: Mutex<Option<String>>,
}

impl MemoryLastIpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(ip: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(ip.into())),
        }
    }
}

impl LastIpStore for MemoryLastIpStore {
    fn record(&self, ip: &str) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(ip.to_owned());
    }

    fn read(&self) -> Option<String> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
