// ── Connection history ──
//
// Capped per-camera ring of connection events. Used for the auto-connect
// heuristic ("has this camera ever connected") and for diagnostics.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HistoryEvent {
    Connected,
    Disconnected,
    Reconnected,
    Failed,
    ReconnectFailed,
}

impl HistoryEvent {
    fn is_success(self) -> bool {
        matches!(self, Self::Connected | Self::Reconnected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionHistoryEntry {
    pub identity: String,
    pub timestamp: DateTime<Utc>,
    pub event: HistoryEvent,
    pub address: SocketAddr,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConnectionHistory {
    limit: usize,
    entries: HashMap<String, VecDeque<ConnectionHistoryEntry>>,
}

impl ConnectionHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn record(
        &mut self,
        identity: &str,
        event: HistoryEvent,
        address: SocketAddr,
        error: Option<String>,
    ) {
        let ring = self.entries.entry(identity.to_owned()).or_default();
        if ring.len() >= self.limit {
            ring.pop_front();
        }
        ring.push_back(ConnectionHistoryEntry {
            identity: identity.to_owned(),
            timestamp: Utc::now(),
            event,
            address,
            error,
        });
    }

    /// Oldest first.
    pub fn entries(&self, identity: &str) -> Vec<ConnectionHistoryEntry> {
        self.entries
            .get(identity)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every entry across cameras, oldest first.
    pub fn all(&self) -> Vec<ConnectionHistoryEntry> {
        let mut all: Vec<_> = self.entries.values().flatten().cloned().collect();
        all.sort_by_key(|e| e.timestamp);
        all
    }

    pub fn has_connected(&self, identity: &str) -> bool {
        self.entries
            .get(identity)
            .is_some_and(|ring| ring.iter().any(|e| e.event.is_success()))
    }

    pub fn clear(&mut self, identity: Option<&str>) {
        match identity {
            Some(id) => {
                self.entries.remove(id);
            }
            None => self.entries.clear(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "10.0.0.5:443".parse().unwrap()
    }

    #[test]
    fn ring_is_capped() {
        let mut history = ConnectionHistory::new(10);
        for _ in 0..15 {
            history.record("cam", HistoryEvent::Failed, addr(), Some("refused".into()));
        }
        assert_eq!(history.entries("cam").len(), 10);
    }

    #[test]
    fn has_connected_tracks_successes_only() {
        let mut history = ConnectionHistory::new(10);
        history.record("cam", HistoryEvent::Failed, addr(), None);
        assert!(!history.has_connected("cam"));
        history.record("cam", HistoryEvent::Reconnected, addr(), None);
        assert!(history.has_connected("cam"));
        assert!(!history.has_connected("other"));
    }

    #[test]
    fn success_ages_out_of_the_ring() {
        let mut history = ConnectionHistory::new(2);
        history.record("cam", HistoryEvent::Connected, addr(), None);
        history.record("cam", HistoryEvent::Disconnected, addr(), None);
        history.record("cam", HistoryEvent::Failed, addr(), None);
        assert!(!history.has_connected("cam"));
    }

    #[test]
    fn clear_one_or_all() {
        let mut history = ConnectionHistory::new(10);
        history.record("a", HistoryEvent::Connected, addr(), None);
        history.record("b", HistoryEvent::Connected, addr(), None);
        history.clear(Some("a"));
        assert!(history.entries("a").is_empty());
        assert_eq!(history.all().len(), 1);
        history.clear(None);
        assert!(history.all().is_empty());
    }
}
