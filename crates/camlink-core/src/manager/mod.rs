// ── Camera state manager ──
//
// Single authoritative registry mapping camera identity to record. The
// registry mutex is only held for in-memory reads and mutations, never
// across network I/O. Connects and reconnects claim their record under the
// lock, talk to the camera without it and commit afterwards if the claim
// is still current. A second mutex serializes connects so deduplication
// and primary failover never interleave. Controller status updates and
// discovery events arrive over channels and are applied by manager tasks.

mod dedup;
mod events;
mod registry;

pub use dedup::{DedupDecision, resolve as resolve_duplicates};
pub use events::{DisconnectReason, ManagerEvent};

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::registry::{CameraRecord, Registry};
use crate::config::ManagerConfig;
use crate::controller::{CameraController, ControllerStatusUpdate};
use crate::discovery::{DiscoveryEvent, DiscoveryListener};
use crate::error::CoreError;
use crate::model::{
    CameraStatus, CameraSummary, ConnectionHistoryEntry, ConnectionState, DeviceDescriptor,
    DiscoveryMethod, DiscoveryStatus, HistoryEvent,
};
use crate::persistence::{LastIpStore, MemoryLastIpStore};

const EVENT_CHANNEL_SIZE: usize = 256;

/// What `register_camera` did with a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegisterOutcome {
    /// New record created.
    Registered,
    /// Existing record updated (new address, new fields or back online).
    Updated,
    /// Identical advertisement for a known record; nothing changed.
    Unchanged,
    /// A higher-priority record already describes this camera.
    Rejected { existing: String },
}

/// Connection work decided during registration, run after the registry
/// lock is released.
enum FollowUp {
    Reconnect(SocketAddr),
    Connect { transfer_primary: bool },
}

/// A connect or reconnect in flight. The record stays `Connecting` with
/// this attempt number until the attempt commits.
struct Claim {
    identity: String,
    attempt: u32,
    descriptor: DeviceDescriptor,
}

impl Claim {
    /// Whether the record is untouched since it was claimed.
    fn is_current(&self, registry: &Registry) -> bool {
        registry.records.get(&self.identity).is_some_and(|r| {
            r.connection_attempts == self.attempt
                && r.status == CameraStatus::Connecting
                && r.descriptor.address() == self.descriptor.address()
        })
    }
}

/// Registry of known cameras with a single primary.
#[derive(Clone)]
pub struct CameraStateManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: ManagerConfig,
    registry: Mutex<Registry>,
    /// Held for a whole connect or reconnect, network I/O included.
    /// Projections never take it.
    connect_lock: Mutex<()>,
    events: broadcast::Sender<ManagerEvent>,
    status_tx: mpsc::UnboundedSender<ControllerStatusUpdate>,
    status_rx: Mutex<Option<mpsc::UnboundedReceiver<ControllerStatusUpdate>>>,
    last_ip: Arc<dyn LastIpStore>,
    discovery: Mutex<Option<DiscoveryListener>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for CameraStateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraStateManager")
            .field("auto_connect", &self.inner.config.auto_connect)
            .finish_non_exhaustive()
    }
}

/// Clean up controllers detached from the registry.
async fn release(controllers: Vec<CameraController>) {
    for controller in controllers {
        controller.cleanup().await;
    }
}

impl CameraStateManager {
    /// Manager with an in-memory last-IP store.
    pub fn new(config: ManagerConfig) -> Self {
        Self::with_last_ip_store(config, Arc::new(MemoryLastIpStore::new()))
    }

    pub fn with_last_ip_store(config: ManagerConfig, last_ip: Arc<dyn LastIpStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(ManagerInner {
                registry: Mutex::new(Registry::new(config.history_limit)),
                connect_lock: Mutex::new(()),
                config,
                events,
                status_tx,
                status_rx: Mutex::new(Some(status_rx)),
                last_ip,
                discovery: Mutex::new(None),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Start applying controller status updates. Idempotent.
    pub async fn initialize(&self) {
        let Some(rx) = self.inner.status_rx.lock().await.take() else {
            return;
        };
        let handle = tokio::spawn(status_task(self.clone(), rx, self.inner.cancel.clone()));
        self.inner.task_handles.lock().await.push(handle);
        debug!("camera state manager initialized");
    }

    /// Subscribe to registry events.
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: ManagerEvent) {
        debug!(?event, "manager event");
        let _ = self.inner.events.send(event);
    }

    fn set_status(&self, registry: &mut Registry, identity: &str, status: CameraStatus) {
        let Some(record) = registry.records.get_mut(identity) else {
            return;
        };
        if record.status != status {
            record.status = status;
            self.emit(ManagerEvent::CameraStatusChanged {
                identity: identity.to_owned(),
                status,
            });
        }
    }

    // ── Registration ─────────────────────────────────────────────

    /// Deduplicate, store or update the record, follow an address change
    /// of the primary, then apply the auto-connect policy.
    pub async fn register_camera(
        &self,
        descriptor: DeviceDescriptor,
    ) -> Result<RegisterOutcome, CoreError> {
        let identity = descriptor.uuid.clone();
        let mut released = Vec::new();
        let (outcome, follow_up) = {
            let mut registry = self.inner.registry.lock().await;
            let decision = dedup::resolve(
                &descriptor,
                registry.records.values().map(|r| &r.descriptor),
            );
            let mut transfer_primary = false;
            match decision {
                DedupDecision::Unique => {}
                DedupDecision::Reject { existing } => {
                    debug!(%identity, %existing, "duplicate camera rejected");
                    return Ok(RegisterOutcome::Rejected { existing });
                }
                DedupDecision::Replace(losers) => {
                    for loser in losers {
                        transfer_primary |=
                            self.remove_locked(&mut registry, &loser, &identity, &mut released);
                    }
                }
            }

            let (outcome, moved_from) = self.store_locked(&mut registry, descriptor);
            let address = registry
                .records
                .get(&identity)
                .map(|r| r.descriptor.address());

            let follow_up = match (moved_from, address) {
                (Some(old), Some(address)) => {
                    info!(%identity, %old, new = %address, "camera address changed");
                    self.emit(ManagerEvent::CameraIpChanged {
                        identity: identity.clone(),
                        old,
                        new: address,
                    });
                    registry
                        .is_primary(&identity)
                        .then_some(FollowUp::Reconnect(address))
                }
                _ => None,
            };
            let follow_up = follow_up.or_else(|| {
                (outcome != RegisterOutcome::Unchanged
                    && self.should_connect(&registry, &identity, transfer_primary))
                .then_some(FollowUp::Connect { transfer_primary })
            });
            (outcome, follow_up)
        };
        release(released).await;

        match follow_up {
            // One automatic attempt; a failure clears the primary.
            Some(FollowUp::Reconnect(address)) => self.follow_address(&identity, address).await,
            Some(FollowUp::Connect { transfer_primary }) => {
                self.auto_connect(&identity, transfer_primary).await;
            }
            None => {}
        }
        Ok(outcome)
    }

    /// Insert or update the record for `descriptor`. Returns the outcome
    /// and the previous address when it moved.
    fn store_locked(
        &self,
        registry: &mut Registry,
        descriptor: DeviceDescriptor,
    ) -> (RegisterOutcome, Option<SocketAddr>) {
        let identity = descriptor.uuid.clone();
        let address = descriptor.address();
        match registry.records.get_mut(&identity) {
            Some(record) => {
                record.last_seen = Utc::now();
                let back_online = record.status == CameraStatus::Offline;
                if record.descriptor.same_advertisement(&descriptor) && !back_online {
                    return (RegisterOutcome::Unchanged, None);
                }
                let old = record.descriptor.address();
                record.descriptor = descriptor;
                if back_online {
                    self.set_status(registry, &identity, CameraStatus::Discovered);
                }
                (RegisterOutcome::Updated, (old != address).then_some(old))
            }
            None => {
                info!(
                    %identity,
                    %address,
                    method = %descriptor.discovery_method,
                    "camera registered"
                );
                let method = descriptor.discovery_method;
                registry
                    .records
                    .insert(identity.clone(), CameraRecord::new(descriptor));
                self.emit(ManagerEvent::CameraRegistered {
                    identity,
                    address,
                    method,
                });
                (RegisterOutcome::Registered, None)
            }
        }
    }

    /// Auto-connect policy: a pending primary transfer always connects;
    /// otherwise, with auto-connect on, connect when there is no primary,
    /// when this camera connected successfully before, or when it sits at
    /// the last successful IP.
    fn should_connect(&self, registry: &Registry, identity: &str, transfer_primary: bool) -> bool {
        let Some(record) = registry.records.get(identity) else {
            return false;
        };
        if registry.is_primary(identity)
            || record.controller.is_some()
            || record.status == CameraStatus::Connecting
        {
            return false;
        }
        if transfer_primary {
            return true;
        }
        if !self.inner.config.auto_connect {
            return false;
        }
        registry.primary.is_none()
            || registry.history.has_connected(identity)
            || self
                .inner
                .last_ip
                .read()
                .is_some_and(|ip| ip == record.descriptor.ip.to_string())
    }

    /// Drop a record superseded during deduplication, detaching its
    /// controller into `released`. Returns whether it was the primary.
    fn remove_locked(
        &self,
        registry: &mut Registry,
        identity: &str,
        replaced_by: &str,
        released: &mut Vec<CameraController>,
    ) -> bool {
        let was_primary = registry.is_primary(identity);
        if was_primary {
            released.extend(self.teardown_locked(
                registry,
                identity,
                DisconnectReason::Replaced,
                None,
            ));
        }
        let Some(mut record) = registry.records.remove(identity) else {
            return was_primary;
        };
        released.extend(record.controller.take());
        info!(%identity, %replaced_by, "duplicate camera record removed");
        self.emit(ManagerEvent::CameraRemoved {
            identity: identity.to_owned(),
            replaced_by: Some(replaced_by.to_owned()),
        });
        was_primary
    }

    /// Registration follow-up: connect if the policy still holds once any
    /// connect in flight has finished.
    async fn auto_connect(&self, identity: &str, transfer_primary: bool) {
        let _serial = self.inner.connect_lock.lock().await;
        let mut released = Vec::new();
        let claim = {
            let mut registry = self.inner.registry.lock().await;
            if !self.should_connect(&registry, identity, transfer_primary) {
                return;
            }
            self.claim_connect_locked(&mut registry, identity, &mut released)
        };
        if let Ok((claim, previous)) = claim {
            let _ = self.finish_connect(claim, previous, released).await;
        }
    }

    /// Registration follow-up: move the primary to its new address if it
    /// is still primary there.
    async fn follow_address(&self, identity: &str, address: SocketAddr) {
        let _serial = self.inner.connect_lock.lock().await;
        let claim = {
            let mut registry = self.inner.registry.lock().await;
            let still_there = registry
                .records
                .get(identity)
                .is_some_and(|r| r.descriptor.address() == address);
            if !registry.is_primary(identity) || !still_there {
                debug!(%identity, "primary moved on before reconnect");
                return;
            }
            self.claim_reconnect_locked(&mut registry, address.ip(), address.port())
        };
        if let Ok((claim, old)) = claim {
            let _ = self.finish_reconnect(claim, old).await;
        }
    }

    // ── Connection ───────────────────────────────────────────────

    /// Connect to a known camera and make it primary. The old primary is
    /// torn down first. Failures are recorded, never retried.
    pub async fn connect_to_camera(&self, identity: &str) -> Result<CameraController, CoreError> {
        let _serial = self.inner.connect_lock.lock().await;
        let mut released = Vec::new();
        let (claim, previous) = {
            let mut registry = self.inner.registry.lock().await;
            self.claim_connect_locked(&mut registry, identity, &mut released)?
        };
        self.finish_connect(claim, previous, released).await
    }

    /// Connect to an address, reusing a known record at that address or
    /// creating a manual one.
    pub async fn connect_to_ip(
        &self,
        ip: IpAddr,
        port: u16,
    ) -> Result<CameraController, CoreError> {
        let _serial = self.inner.connect_lock.lock().await;
        let address = SocketAddr::new(ip, port);
        let mut released = Vec::new();
        let (claim, previous) = {
            let mut registry = self.inner.registry.lock().await;
            let known = registry
                .records
                .values()
                .find(|r| r.descriptor.address() == address)
                .map(|r| r.descriptor.uuid.clone());

            let identity = if let Some(identity) = known {
                identity
            } else {
                let descriptor =
                    DeviceDescriptor::manual(ip, port).map_err(|e| CoreError::Config {
                        message: format!("invalid camera address {address}: {e}"),
                    })?;
                let identity = descriptor.uuid.clone();
                registry
                    .records
                    .insert(identity.clone(), CameraRecord::new(descriptor));
                self.emit(ManagerEvent::CameraRegistered {
                    identity: identity.clone(),
                    address,
                    method: DiscoveryMethod::Manual,
                });
                identity
            };
            self.claim_connect_locked(&mut registry, &identity, &mut released)?
        };
        self.finish_connect(claim, previous, released).await
    }

    /// Tear down the current primary and any stale controller of
    /// `identity`, then mark it connecting. Returns the claim and the
    /// previous primary.
    fn claim_connect_locked(
        &self,
        registry: &mut Registry,
        identity: &str,
        released: &mut Vec<CameraController>,
    ) -> Result<(Claim, Option<String>), CoreError> {
        if !registry.records.contains_key(identity) {
            return Err(CoreError::CameraNotFound {
                identity: identity.to_owned(),
            });
        }

        let previous = registry.primary.clone();
        if let Some(previous) = &previous {
            released.extend(self.teardown_locked(
                registry,
                previous,
                DisconnectReason::Replaced,
                None,
            ));
        }

        let Some(record) = registry.records.get_mut(identity) else {
            return Err(CoreError::CameraNotFound {
                identity: identity.to_owned(),
            });
        };
        released.extend(record.controller.take());
        record.connection_attempts = record.connection_attempts.saturating_add(1);
        let claim = Claim {
            identity: identity.to_owned(),
            attempt: record.connection_attempts,
            descriptor: record.descriptor.clone(),
        };
        self.set_status(registry, identity, CameraStatus::Connecting);
        Ok((claim, previous))
    }

    /// Network half of a connect, then the commit. Runs under
    /// `connect_lock` with the registry unlocked.
    async fn finish_connect(
        &self,
        claim: Claim,
        previous: Option<String>,
        released: Vec<CameraController>,
    ) -> Result<CameraController, CoreError> {
        release(released).await;
        let identity = claim.identity.as_str();
        let descriptor = &claim.descriptor;
        info!(%identity, address = %descriptor.address(), "connecting to camera");

        let opened = self.open_controller(descriptor).await;
        let mut registry = self.inner.registry.lock().await;
        let controller = match opened {
            Ok(controller) => controller,
            Err(err) if claim.is_current(&registry) => {
                return Err(self.fail_locked(
                    &mut registry,
                    identity,
                    descriptor,
                    err,
                    HistoryEvent::Failed,
                ));
            }
            Err(err) => return Err(err),
        };
        if !claim.is_current(&registry) {
            drop(registry);
            debug!(%identity, "connect superseded, discarding controller");
            controller.cleanup().await;
            return Err(CoreError::Superseded {
                identity: identity.to_owned(),
            });
        }

        if let Some(record) = registry.records.get_mut(identity) {
            record.controller = Some(controller.clone());
            record.last_error = None;
            record.last_seen = Utc::now();
        }
        self.set_status(&mut registry, identity, CameraStatus::Connected);
        registry.primary = Some(identity.to_owned());
        registry
            .history
            .record(identity, HistoryEvent::Connected, descriptor.address(), None);
        self.inner.last_ip.record(&descriptor.ip.to_string());
        self.emit(ManagerEvent::PrimaryCameraChanged {
            identity: identity.to_owned(),
            previous,
        });
        drop(registry);
        info!(%identity, label = descriptor.label(), "primary camera connected");

        if descriptor.discovery_method != DiscoveryMethod::Ssdp {
            self.enrich(identity, &controller).await;
        }
        Ok(controller)
    }

    /// Build and initialize a controller; cleaned up again on failure.
    async fn open_controller(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<CameraController, CoreError> {
        let controller = CameraController::new(
            descriptor.clone(),
            &self.inner.config.controller,
            Some(self.inner.status_tx.clone()),
        )?;
        match controller.initialize().await {
            Ok(()) => Ok(controller),
            Err(err) => {
                controller.cleanup().await;
                Err(err)
            }
        }
    }

    /// Fill identification fields of a manual or scanned record from the
    /// camera itself, so later SSDP discovery deduplicates by serial.
    async fn enrich(&self, identity: &str, controller: &CameraController) {
        let info = match controller.device_information().await {
            Ok(info) => info,
            Err(e) => {
                debug!(%identity, error = %e, "device information unavailable");
                return;
            }
        };
        let mut registry = self.inner.registry.lock().await;
        let Some(record) = registry.records.get_mut(identity) else {
            return;
        };
        if record.controller.as_ref().map(CameraController::id) != Some(controller.id()) {
            return;
        }
        let descriptor = &mut record.descriptor;
        if descriptor.serial_number.is_none() {
            descriptor.serial_number = info.serial_number;
        }
        if descriptor.model_name.is_none() {
            descriptor.model_name = info.product_name;
        }
        if descriptor.manufacturer.is_none() {
            descriptor.manufacturer = info.manufacturer;
        }
    }

    /// Record a failed connect: status, error, history and event.
    fn fail_locked(
        &self,
        registry: &mut Registry,
        identity: &str,
        descriptor: &DeviceDescriptor,
        err: CoreError,
        event: HistoryEvent,
    ) -> CoreError {
        let message = err.to_string();
        warn!(
            %identity,
            address = %descriptor.address(),
            error = %message,
            "camera connection failed"
        );
        if let Some(record) = registry.records.get_mut(identity) {
            record.controller = None;
            record.last_error = Some(message.clone());
        }
        self.set_status(registry, identity, CameraStatus::Failed);
        registry
            .history
            .record(identity, event, descriptor.address(), Some(message));
        self.emit(ManagerEvent::CameraConnectionFailed {
            identity: identity.to_owned(),
            error: err.clone(),
        });
        err
    }

    /// Detach a record's controller and clear the primary if it held it.
    /// The caller cleans up the returned controller once unlocked.
    fn teardown_locked(
        &self,
        registry: &mut Registry,
        identity: &str,
        reason: DisconnectReason,
        error: Option<String>,
    ) -> Option<CameraController> {
        let Some(record) = registry.records.get_mut(identity) else {
            if registry.is_primary(identity) {
                registry.primary = None;
            }
            return None;
        };
        let controller = record.controller.take();
        let address = record.descriptor.address();
        if controller.is_some() {
            registry
                .history
                .record(identity, HistoryEvent::Disconnected, address, error.clone());
        }
        self.set_status(registry, identity, CameraStatus::Disconnected);

        if registry.is_primary(identity) {
            registry.primary = None;
            info!(%identity, %reason, "primary camera released");
            self.emit(ManagerEvent::PrimaryCameraDisconnected {
                identity: identity.to_owned(),
                reason,
                error,
            });
        }
        controller
    }

    /// Move the primary camera to a new address: clean up its controller,
    /// rewrite the record's address and connect a fresh controller. A
    /// failure clears the primary.
    pub async fn reconnect_primary_camera(
        &self,
        ip: IpAddr,
        port: u16,
    ) -> Result<CameraController, CoreError> {
        let _serial = self.inner.connect_lock.lock().await;
        let (claim, old) = {
            let mut registry = self.inner.registry.lock().await;
            self.claim_reconnect_locked(&mut registry, ip, port)?
        };
        self.finish_reconnect(claim, old).await
    }

    /// Detach the primary's controller, rewrite its address and mark it
    /// connecting. The primary reference stays in place.
    fn claim_reconnect_locked(
        &self,
        registry: &mut Registry,
        ip: IpAddr,
        port: u16,
    ) -> Result<(Claim, Option<CameraController>), CoreError> {
        let identity = registry.primary.clone().ok_or(CoreError::NoPrimaryCamera)?;
        let Some(record) = registry.records.get_mut(&identity) else {
            registry.primary = None;
            return Err(CoreError::CameraNotFound { identity });
        };
        let old = record.controller.take();
        record.descriptor = record.descriptor.with_address(ip, port);
        record.connection_attempts = record.connection_attempts.saturating_add(1);
        let claim = Claim {
            attempt: record.connection_attempts,
            descriptor: record.descriptor.clone(),
            identity,
        };
        self.set_status(registry, &claim.identity, CameraStatus::Connecting);
        Ok((claim, old))
    }

    async fn finish_reconnect(
        &self,
        claim: Claim,
        old: Option<CameraController>,
    ) -> Result<CameraController, CoreError> {
        if let Some(old) = old {
            old.cleanup().await;
        }
        let identity = claim.identity.as_str();
        let descriptor = &claim.descriptor;
        info!(%identity, address = %descriptor.address(), "reconnecting primary camera");

        let opened = self.open_controller(descriptor).await;
        let mut registry = self.inner.registry.lock().await;
        let current = claim.is_current(&registry) && registry.is_primary(identity);
        match opened {
            Ok(controller) if current => {
                if let Some(record) = registry.records.get_mut(identity) {
                    record.controller = Some(controller.clone());
                    record.last_error = None;
                    record.last_seen = Utc::now();
                }
                self.set_status(&mut registry, identity, CameraStatus::Connected);
                registry.history.record(
                    identity,
                    HistoryEvent::Reconnected,
                    descriptor.address(),
                    None,
                );
                self.inner.last_ip.record(&descriptor.ip.to_string());
                self.emit(ManagerEvent::PrimaryCameraReconnected {
                    identity: identity.to_owned(),
                    address: descriptor.address(),
                });
                info!(%identity, address = %descriptor.address(), "primary camera reconnected");
                Ok(controller)
            }
            Ok(controller) => {
                drop(registry);
                debug!(%identity, "reconnect superseded, discarding controller");
                controller.cleanup().await;
                Err(CoreError::Superseded {
                    identity: identity.to_owned(),
                })
            }
            Err(err) if current => {
                registry.primary = None;
                let err = self.fail_locked(
                    &mut registry,
                    identity,
                    descriptor,
                    err,
                    HistoryEvent::ReconnectFailed,
                );
                self.emit(ManagerEvent::PrimaryCameraDisconnected {
                    identity: identity.to_owned(),
                    reason: DisconnectReason::ReconnectFailed,
                    error: Some(err.to_string()),
                });
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Disconnect the primary camera. Returns whether there was one.
    pub async fn disconnect_primary_camera(&self) -> bool {
        let detached = {
            let mut registry = self.inner.registry.lock().await;
            let Some(identity) = registry.primary.clone() else {
                return false;
            };
            self.teardown_locked(&mut registry, &identity, DisconnectReason::UserRequested, None)
        };
        release(detached.into_iter().collect()).await;
        true
    }

    // ── Inbound updates ──────────────────────────────────────────

    /// Apply a controller status report. Reports from controllers other
    /// than the record's current one are stale and ignored.
    pub async fn handle_controller_status_change(&self, update: ControllerStatusUpdate) {
        let detached = {
            let mut registry = self.inner.registry.lock().await;
            let identity = update.identity.as_str();
            let Some(record) = registry.records.get_mut(identity) else {
                return;
            };
            if record.controller.as_ref().map(CameraController::id) != Some(update.controller_id) {
                debug!(
                    %identity,
                    controller = update.controller_id,
                    "stale controller status ignored"
                );
                return;
            }
            if update.state != ConnectionState::Disconnected {
                return;
            }

            let error = update.fault.as_ref().map(ToString::to_string);
            record.last_error.clone_from(&error);
            let reason = if update.fault.as_ref().is_some_and(|f| f.is_network()) {
                DisconnectReason::ConnectionLost
            } else {
                DisconnectReason::DeviceError
            };
            warn!(
                %identity,
                %reason,
                error = error.as_deref().unwrap_or("none"),
                "camera connection lost"
            );
            self.teardown_locked(&mut registry, identity, reason, error)
        };
        release(detached.into_iter().collect()).await;
    }

    /// Mark a camera offline after it left the network, releasing it if it
    /// was connected. Returns whether the identity was known.
    pub async fn mark_offline(&self, identity: &str) -> bool {
        let detached = {
            let mut registry = self.inner.registry.lock().await;
            let Some(record) = registry.records.get(identity) else {
                return false;
            };
            let detached = if record.controller.is_some() || registry.is_primary(identity) {
                self.teardown_locked(&mut registry, identity, DisconnectReason::Offline, None)
            } else {
                None
            };
            self.set_status(&mut registry, identity, CameraStatus::Offline);
            detached
        };
        release(detached.into_iter().collect()).await;
        true
    }

    // ── Projections ──────────────────────────────────────────────

    pub async fn primary_controller(&self) -> Option<CameraController> {
        let registry = self.inner.registry.lock().await;
        let identity = registry.primary.as_deref()?;
        registry.records.get(identity)?.controller.clone()
    }

    pub async fn primary_camera(&self) -> Option<CameraSummary> {
        let registry = self.inner.registry.lock().await;
        let identity = registry.primary.as_deref()?;
        registry
            .records
            .get(identity)
            .map(|r| r.summary(Some(identity)))
    }

    pub async fn camera(&self, identity: &str) -> Option<CameraSummary> {
        let registry = self.inner.registry.lock().await;
        registry
            .records
            .get(identity)
            .map(|r| r.summary(registry.primary.as_deref()))
    }

    /// Every record, sorted by identity.
    pub async fn all_cameras(&self) -> Vec<CameraSummary> {
        self.inner.registry.lock().await.summaries()
    }

    pub async fn discovery_status(&self) -> DiscoveryStatus {
        let listener = self.inner.discovery.lock().await.clone();
        let (discovery_running, discovered_devices) = match &listener {
            Some(listener) => (listener.is_running().await, listener.discovered().len()),
            None => (false, 0),
        };
        let registry = self.inner.registry.lock().await;
        DiscoveryStatus {
            discovery_running,
            discovered_devices,
            known_cameras: registry.records.len(),
            primary: registry.primary.clone(),
            last_successful_ip: self.inner.last_ip.read(),
        }
    }

    /// History for one camera, or for all cameras when `identity` is `None`.
    pub async fn connection_history(&self, identity: Option<&str>) -> Vec<ConnectionHistoryEntry> {
        let registry = self.inner.registry.lock().await;
        match identity {
            Some(id) => registry.history.entries(id),
            None => registry.history.all(),
        }
    }

    pub async fn clear_connection_history(&self, identity: Option<&str>) {
        self.inner.registry.lock().await.history.clear(identity);
    }

    pub fn last_successful_ip(&self) -> Option<String> {
        self.inner.last_ip.read()
    }

    // ── Discovery ────────────────────────────────────────────────

    /// Feed a discovery listener's events into the registry. The manager
    /// stops the listener on cleanup.
    pub async fn attach_discovery(&self, listener: DiscoveryListener) {
        let rx = listener.subscribe();
        *self.inner.discovery.lock().await = Some(listener);
        let handle = tokio::spawn(discovery_task(self.clone(), rx, self.inner.cancel.clone()));
        self.inner.task_handles.lock().await.push(handle);
    }

    /// Stop manager tasks and discovery, release the primary and every
    /// controller, and clear all records and history. Safe to call
    /// repeatedly. A connect still in flight finds its record gone and
    /// discards its controller.
    pub async fn cleanup(&self) {
        self.inner.cancel.cancel();
        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        let listener = self.inner.discovery.lock().await.take();
        if let Some(listener) = listener {
            listener.stop_discovery().await;
        }

        let mut released = Vec::new();
        {
            let mut registry = self.inner.registry.lock().await;
            if let Some(primary) = registry.primary.clone() {
                released.extend(self.teardown_locked(
                    &mut registry,
                    &primary,
                    DisconnectReason::UserRequested,
                    None,
                ));
            }
            for record in registry.records.values_mut() {
                released.extend(record.controller.take());
            }
            if !registry.records.is_empty() {
                info!(cameras = registry.records.len(), "camera state manager cleaned up");
            }
            registry.records.clear();
            registry.primary = None;
            registry.history.clear(None);
        }
        release(released).await;
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn status_task(
    manager: CameraStateManager,
    mut rx: mpsc::UnboundedReceiver<ControllerStatusUpdate>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            update = rx.recv() => match update {
                Some(update) => manager.handle_controller_status_change(update).await,
                None => break,
            },
        }
    }
}

async fn discovery_task(
    manager: CameraStateManager,
    mut rx: broadcast::Receiver<DiscoveryEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Ok(DiscoveryEvent::CameraDiscovered { descriptor }) => {
                    if let Err(e) = manager.register_camera(*descriptor).await {
                        warn!(error = %e, "camera registration failed");
                    }
                }
                Ok(DiscoveryEvent::DeviceOffline { uuid }) => {
                    manager.mark_offline(&uuid).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "discovery events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
