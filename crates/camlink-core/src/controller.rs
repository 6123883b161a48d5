// ── Camera controller ──
//
// Owns one HTTPS control session to one camera: capability map, shutter
// endpoint, query surface and two periodic supervision tasks (health
// heartbeat and settings poll), each pausable on its own.
//
// State machine: disconnected -> connecting -> connected -> disconnected.
// Only an explicit `connect()` re-enters `connecting`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use camlink_api::CcapiClient;
use camlink_api::ccapi::{
    BatteryStatus, CameraDateTime, CameraEvents, Capabilities, DeviceInformation, PollWait,
    ShootingSettings, ShutterEndpoint, ShutterKind, StorageInfo, Temperature, ZoneOffsets,
    format_camera_datetime, parse_camera_datetime, parse_shutter_speed,
};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::error::{CameraFault, CoreError};
use crate::model::{ConnectionState, DeviceDescriptor};

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(1);

/// Sent to the registered sink when a connected controller loses its
/// camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStatusUpdate {
    pub identity: String,
    /// Distinguishes this controller from earlier ones for the same camera.
    pub controller_id: u64,
    pub state: ConnectionState,
    pub fault: Option<CameraFault>,
}

pub type StatusSink = mpsc::UnboundedSender<ControllerStatusUpdate>;

/// Result of one heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    Healthy,
    /// Failed, still under the threshold.
    Degraded { failures: u32 },
    /// This check crossed the threshold and disconnected the controller.
    Disconnected,
    /// Controller was not connected; nothing was sent.
    NotConnected,
}

/// Projection of the controller's session for callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub identity: String,
    pub address: SocketAddr,
    pub control_url: String,
    pub state: ConnectionState,
    pub consecutive_failures: u32,
    pub monitoring_paused: bool,
    pub polling_paused: bool,
    pub last_error: Option<String>,
    pub shutter: Option<ShutterEndpoint>,
    pub endpoint_count: usize,
}

/// Outcome of [`CameraController::validate_interval`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalValidation {
    pub valid: bool,
    pub interval_secs: f64,
    /// Shutter speed as the camera reports it.
    pub shutter_speed: Option<String>,
    pub shutter_secs: Option<f64>,
    pub warning: Option<String>,
}

/// Camera clock as reported, plus its parsed form when valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraDateTimeDetails {
    pub datetime: String,
    pub dst: bool,
    pub parsed: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Default)]
struct Session {
    capabilities: Option<Capabilities>,
    shutter: Option<ShutterEndpoint>,
    last_error: Option<String>,
}

/// Control session for one camera.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Never shared between two
/// cameras; the state manager builds a new controller for every connect.
#[derive(Clone)]
pub struct CameraController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    id: u64,
    descriptor: DeviceDescriptor,
    config: ControllerConfig,
    client: CcapiClient,
    state: watch::Sender<ConnectionState>,
    settings: watch::Sender<Option<Arc<ShootingSettings>>>,
    session: Mutex<Session>,
    consecutive_failures: AtomicU32,
    monitoring_paused: AtomicBool,
    polling_paused: AtomicBool,
    status_sink: Option<StatusSink>,
    cancel: CancellationToken,
    /// Child token for the current periodic tasks; cancelled on
    /// disconnect and replaced on the next `initialize()`.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for CameraController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraController")
            .field("id", &self.inner.id)
            .field("identity", &self.inner.descriptor.uuid)
            .field("url", &self.inner.client.base_url().as_str())
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Resumes connection monitoring and info polling when dropped.
#[derive(Debug)]
#[must_use = "supervision resumes as soon as the guard is dropped"]
pub struct SupervisionPause<'a> {
    controller: &'a CameraController,
}

impl Drop for SupervisionPause<'_> {
    fn drop(&mut self) {
        self.controller.resume_info_polling();
        self.controller.resume_connection_monitoring();
    }
}

impl CameraController {
    /// Create a controller for `descriptor`. Does NOT connect; call
    /// [`initialize()`](Self::initialize).
    pub fn new(
        descriptor: DeviceDescriptor,
        config: &ControllerConfig,
        status_sink: Option<StatusSink>,
    ) -> Result<Self, CoreError> {
        let client = CcapiClient::new(descriptor.control_url.clone(), &config.transport())?;
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (settings, _) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Ok(Self {
            inner: Arc::new(ControllerInner {
                id: NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed),
                descriptor,
                config: config.clone(),
                client,
                state,
                settings,
                session: Mutex::new(Session::default()),
                consecutive_failures: AtomicU32::new(0),
                monitoring_paused: AtomicBool::new(false),
                polling_paused: AtomicBool::new(false),
                status_sink,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn identity(&self) -> &str {
        &self.inner.descriptor.uuid
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.inner.descriptor
    }

    pub fn address(&self) -> SocketAddr {
        self.inner.descriptor.address()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Observe connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Latest settings snapshot from connect, the poll task or an explicit
    /// query.
    pub fn latest_settings(&self) -> Option<Arc<ShootingSettings>> {
        self.inner.settings.borrow().clone()
    }

    pub fn subscribe_settings(&self) -> watch::Receiver<Option<Arc<ShootingSettings>>> {
        self.inner.settings.subscribe()
    }

    pub async fn capabilities(&self) -> Option<Capabilities> {
        self.inner.session.lock().await.capabilities.clone()
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect, then start the health and settings-poll tasks.
    pub async fn initialize(&self) -> Result<(), CoreError> {
        self.connect().await?;
        self.start_tasks().await;
        Ok(())
    }

    /// Fetch the capability map, select the shutter endpoint and check the
    /// settings endpoint.
    ///
    /// A gateway error (HTTP 502) is transient while the camera's network
    /// stack comes up: it is retried up to `max_connect_retries` times.
    /// Every other failure is returned immediately.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        inner.state.send_replace(ConnectionState::Connecting);
        debug!(
            identity = %inner.descriptor.uuid,
            url = %inner.client.base_url(),
            "connecting to camera"
        );

        let capabilities = match self.fetch_capabilities().await {
            Ok(caps) => caps,
            Err(err) => {
                inner.session.lock().await.last_error = Some(err.to_string());
                inner.state.send_replace(ConnectionState::Disconnected);
                return Err(err);
            }
        };

        let shutter = capabilities.shutter_endpoint();
        match &shutter {
            Some(endpoint) => {
                debug!(path = %endpoint.path, kind = ?endpoint.kind, "selected shutter endpoint");
            }
            None => warn!(identity = %inner.descriptor.uuid, "camera lists no shutter endpoint"),
        }

        match inner
            .client
            .shooting_settings(inner.config.request_timeout)
            .await
        {
            Ok(settings) => {
                inner.settings.send_replace(Some(Arc::new(settings)));
            }
            Err(e) => debug!(error = %e, "settings check failed (non-fatal)"),
        }

        {
            let mut session = inner.session.lock().await;
            session.capabilities = Some(capabilities);
            session.shutter = shutter;
            session.last_error = None;
        }
        inner.consecutive_failures.store(0, Ordering::Relaxed);
        inner.state.send_replace(ConnectionState::Connected);
        info!(
            identity = %inner.descriptor.uuid,
            address = %inner.descriptor.address(),
            "camera connected"
        );
        Ok(())
    }

    async fn fetch_capabilities(&self) -> Result<Capabilities, CoreError> {
        let config = &self.inner.config;
        let mut retry = 0;
        loop {
            match self.inner.client.capabilities(config.request_timeout).await {
                Ok(caps) => return Ok(caps),
                Err(e) if e.is_bad_gateway() => {
                    if retry >= config.max_connect_retries {
                        warn!(attempts = retry + 1, "camera gateway error persists");
                        return Err(CoreError::DeviceNeedsRestart {
                            attempts: retry + 1,
                        });
                    }
                    retry += 1;
                    warn!(
                        retry,
                        max_retries = config.max_connect_retries,
                        "camera gateway error, retrying"
                    );
                    tokio::time::sleep(config.gateway_retry_delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn start_tasks(&self) {
        let child = self.inner.cancel.child_token();
        let previous = std::mem::replace(&mut *self.inner.cancel_child.lock().await, child.clone());
        previous.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        let health = self.inner.config.health_check_interval;
        if !health.is_zero() {
            handles.push(tokio::spawn(health_task(self.clone(), health, child.clone())));
        }

        let poll = self.inner.config.info_poll_interval;
        if !poll.is_zero() {
            handles.push(tokio::spawn(info_poll_task(self.clone(), poll, child)));
        }
    }

    /// Cancel both periodic tasks, release a manual shutter best-effort
    /// and mark the controller disconnected. Safe to call repeatedly.
    pub async fn cleanup(&self) {
        self.inner.cancel_child.lock().await.cancel();
        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        let shutter = self.inner.session.lock().await.shutter.clone();
        if self.is_connected() {
            if let Some(endpoint) = shutter.filter(|s| s.kind == ShutterKind::Manual) {
                if let Err(e) = self
                    .inner
                    .client
                    .release_shutter(&endpoint, self.inner.config.release_timeout)
                    .await
                {
                    debug!(error = %e, "release during cleanup failed (non-fatal)");
                }
            }
        }

        *self.inner.session.lock().await = Session::default();
        self.inner.settings.send_replace(None);
        self.inner.consecutive_failures.store(0, Ordering::Relaxed);
        let previous = self.inner.state.send_replace(ConnectionState::Disconnected);
        if previous != ConnectionState::Disconnected {
            info!(identity = %self.inner.descriptor.uuid, "camera controller cleaned up");
        }
    }

    /// Shared disconnection handler. Acts only on a connected ->
    /// disconnected transition, so repeated failures report once.
    async fn handle_disconnection(&self, fault: CameraFault) {
        let transitioned = self.inner.state.send_if_modified(|state| {
            if *state == ConnectionState::Connected {
                *state = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        });
        if !transitioned {
            return;
        }

        self.inner.cancel_child.lock().await.cancel();
        self.inner.session.lock().await.last_error = Some(fault.message.clone());
        warn!(
            identity = %self.inner.descriptor.uuid,
            error = %fault,
            "camera disconnected"
        );

        if let Some(sink) = &self.inner.status_sink {
            let _ = sink.send(ControllerStatusUpdate {
                identity: self.inner.descriptor.uuid.clone(),
                controller_id: self.inner.id,
                state: ConnectionState::Disconnected,
                fault: Some(fault),
            });
        }
    }

    // ── Supervision ──────────────────────────────────────────────

    /// One heartbeat. Success resets the failure counter; the failure that
    /// reaches `max_consecutive_failures` disconnects.
    pub async fn check_health(&self) -> HealthOutcome {
        if !self.is_connected() {
            return HealthOutcome::NotConnected;
        }
        match self.inner.client.ping(self.inner.config.request_timeout).await {
            Ok(()) => {
                let previous = self.inner.consecutive_failures.swap(0, Ordering::Relaxed);
                if previous > 0 {
                    info!(previous_failures = previous, "camera health recovered");
                }
                HealthOutcome::Healthy
            }
            Err(err) => {
                let failures = self.inner.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                let max = self.inner.config.max_consecutive_failures.max(1);
                let fault = CameraFault::from(&err);
                if failures >= max {
                    warn!(failures, max, error = %fault, "health check threshold reached");
                    self.handle_disconnection(fault).await;
                    HealthOutcome::Disconnected
                } else {
                    debug!(failures, max, error = %fault, "health check failed");
                    HealthOutcome::Degraded { failures }
                }
            }
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn pause_connection_monitoring(&self) {
        self.inner.monitoring_paused.store(true, Ordering::Relaxed);
        debug!("connection monitoring paused");
    }

    /// Resume heartbeats with a fresh failure counter.
    pub fn resume_connection_monitoring(&self) {
        self.inner.consecutive_failures.store(0, Ordering::Relaxed);
        self.inner.monitoring_paused.store(false, Ordering::Relaxed);
        debug!("connection monitoring resumed");
    }

    pub fn pause_info_polling(&self) {
        self.inner.polling_paused.store(true, Ordering::Relaxed);
    }

    pub fn resume_info_polling(&self) {
        self.inner.polling_paused.store(false, Ordering::Relaxed);
    }

    /// Pause heartbeats and settings polling until the guard drops, e.g.
    /// across a burst of shots that keeps the camera busy.
    pub fn pause_supervision(&self) -> SupervisionPause<'_> {
        self.pause_connection_monitoring();
        self.pause_info_polling();
        SupervisionPause { controller: self }
    }

    async fn refresh_settings(&self) {
        match self
            .inner
            .client
            .shooting_settings(self.inner.config.request_timeout)
            .await
        {
            Ok(settings) => {
                self.inner.settings.send_replace(Some(Arc::new(settings)));
            }
            Err(e) => debug!(error = %e, "settings poll failed"),
        }
    }

    pub async fn connection_status(&self) -> ConnectionStatus {
        let session = self.inner.session.lock().await;
        ConnectionStatus {
            identity: self.inner.descriptor.uuid.clone(),
            address: self.inner.descriptor.address(),
            control_url: self.inner.client.base_url().to_string(),
            state: self.state(),
            consecutive_failures: self.consecutive_failures(),
            monitoring_paused: self.inner.monitoring_paused.load(Ordering::Relaxed),
            polling_paused: self.inner.polling_paused.load(Ordering::Relaxed),
            last_error: session.last_error.clone(),
            shutter: session.shutter.clone(),
            endpoint_count: session.capabilities.as_ref().map_or(0, Capabilities::len),
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    fn ensure_connected(&self) -> Result<(), CoreError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(CoreError::NotConnected)
        }
    }

    /// Run one camera request. Failures become a [`CameraFault`];
    /// network-class failures also disconnect the controller.
    async fn request<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, CoreError>
    where
        F: FnOnce(CcapiClient) -> Fut,
        Fut: Future<Output = Result<T, camlink_api::Error>>,
    {
        self.ensure_connected()?;
        match call(self.inner.client.clone()).await {
            Ok(value) => Ok(value),
            Err(err) => {
                let fault = CameraFault::from(&err);
                debug!(operation, error = %fault, "camera request failed");
                if fault.is_network() {
                    self.handle_disconnection(fault.clone()).await;
                } else {
                    self.inner.session.lock().await.last_error = Some(fault.message.clone());
                }
                Err(CoreError::Camera(fault))
            }
        }
    }

    pub async fn camera_settings(&self) -> Result<ShootingSettings, CoreError> {
        let timeout = self.inner.config.request_timeout;
        let settings = self
            .request("camera_settings", |c| async move {
                c.shooting_settings(timeout).await
            })
            .await?;
        self.inner
            .settings
            .send_replace(Some(Arc::new(settings.clone())));
        Ok(settings)
    }

    pub async fn update_camera_setting(
        &self,
        name: &str,
        value: serde_json::Value,
    ) -> Result<serde_json::Value, CoreError> {
        let name = name.to_owned();
        let updated = self
            .request("update_camera_setting", |c| async move {
                c.update_shooting_setting(&name, &value).await
            })
            .await?;
        info!(setting = ?updated, "camera setting updated");
        Ok(updated)
    }

    /// Wait for property changes on the camera. A long poll is held for
    /// about 30 seconds, so it runs with the press timeout.
    pub async fn poll_events(&self, wait: PollWait) -> Result<CameraEvents, CoreError> {
        let timeout = self.inner.config.press_timeout;
        self.request("poll_events", |c| async move {
            c.poll_events(wait, timeout).await
        })
        .await
    }

    pub async fn device_information(&self) -> Result<DeviceInformation, CoreError> {
        self.request("device_information", |c| async move {
            c.device_information().await
        })
        .await
    }

    pub async fn camera_battery(&self) -> Result<BatteryStatus, CoreError> {
        self.request("camera_battery", |c| async move { c.battery().await })
            .await
    }

    pub async fn storage_info(&self) -> Result<StorageInfo, CoreError> {
        self.request("storage_info", |c| async move { c.storage().await })
            .await
    }

    pub async fn camera_temperature(&self) -> Result<Temperature, CoreError> {
        self.request("camera_temperature", |c| async move {
            c.temperature().await
        })
        .await
    }

    pub async fn camera_date_time_details(&self) -> Result<CameraDateTimeDetails, CoreError> {
        let raw = self
            .request("camera_date_time", |c| async move { c.datetime().await })
            .await?;
        let parsed = parse_camera_datetime(&raw.datetime).ok();
        Ok(CameraDateTimeDetails {
            datetime: raw.datetime,
            dst: raw.dst,
            parsed,
        })
    }

    pub async fn camera_date_time(&self) -> Result<DateTime<FixedOffset>, CoreError> {
        let details = self.camera_date_time_details().await?;
        details.parsed.ok_or_else(|| {
            CoreError::Camera(CameraFault::new(format!(
                "unparseable camera datetime {:?}",
                details.datetime
            )))
        })
    }

    /// Set the camera clock from a host-local time.
    pub async fn set_camera_date_time(
        &self,
        when: DateTime<Local>,
    ) -> Result<CameraDateTime, CoreError> {
        self.set_camera_date_time_in(&Local, &when.naive_local())
            .await
    }

    /// Set the camera clock to `local` wall-clock time in `zone`: the
    /// zone's standard offset goes into the timestamp, DST into the flag.
    pub async fn set_camera_date_time_in<Z>(
        &self,
        zone: &Z,
        local: &NaiveDateTime,
    ) -> Result<CameraDateTime, CoreError>
    where
        Z: ZoneOffsets + Sync + ?Sized,
    {
        let payload = format_camera_datetime(zone, local);
        let body = payload.clone();
        self.request("set_camera_date_time", |c| async move {
            c.set_datetime(&body).await
        })
        .await?;
        info!(datetime = %payload.datetime, dst = payload.dst, "camera clock set");
        Ok(payload)
    }

    // ── Shutter ──────────────────────────────────────────────────

    async fn shutter(&self) -> Result<ShutterEndpoint, CoreError> {
        self.ensure_connected()?;
        self.inner
            .session
            .lock()
            .await
            .shutter
            .clone()
            .ok_or(CoreError::NoShutterEndpoint)
    }

    async fn try_press(
        &self,
        shutter: &ShutterEndpoint,
        use_autofocus: bool,
    ) -> Result<(), CameraFault> {
        self.inner
            .client
            .press_shutter(shutter, use_autofocus, self.inner.config.press_timeout)
            .await
            .map_err(|e| {
                let fault = CameraFault::from(&e);
                warn!(error = %fault, "shutter press failed");
                fault
            })
    }

    async fn try_release(&self, shutter: &ShutterEndpoint) -> Result<(), CameraFault> {
        self.inner
            .client
            .release_shutter(shutter, self.inner.config.release_timeout)
            .await
            .map_err(|e| {
                let fault = CameraFault::from(&e);
                debug!(error = %fault, "shutter release failed");
                fault
            })
    }

    /// Full press. `Ok(false)` when the camera rejects it or times out.
    pub async fn press_shutter(&self, use_autofocus: bool) -> Result<bool, CoreError> {
        let shutter = self.shutter().await?;
        Ok(self.try_press(&shutter, use_autofocus).await.is_ok())
    }

    /// Release. Always `Ok(true)` for the auto-releasing endpoint.
    pub async fn release_shutter(&self) -> Result<bool, CoreError> {
        let shutter = self.shutter().await?;
        Ok(self.try_release(&shutter).await.is_ok())
    }

    /// Release, press with autofocus off, settle, release.
    ///
    /// Not safe against concurrent calls on the same controller; the
    /// caller serializes shots.
    pub async fn take_photo(&self) -> Result<(), CoreError> {
        let shutter = self.shutter().await?;

        // Clears a press left over from an interrupted shot.
        let _ = self.try_release(&shutter).await;

        if let Err(fault) = self.try_press(&shutter, false).await {
            let _ = self.try_release(&shutter).await;
            return Err(CoreError::Shutter {
                message: fault.to_string(),
            });
        }

        tokio::time::sleep(self.inner.config.shutter_settle).await;

        if let Err(fault) = self.try_release(&shutter).await {
            warn!(error = %fault, "release after shot failed");
        }
        debug!(identity = %self.inner.descriptor.uuid, "photo taken");
        Ok(())
    }

    /// Check that a shooting interval is longer than the current exposure.
    ///
    /// Anything that prevents the check (no settings, bulb, unknown
    /// notation) reports valid with a warning.
    pub async fn validate_interval(&self, interval_secs: f64) -> IntervalValidation {
        let mut result = IntervalValidation {
            valid: true,
            interval_secs,
            shutter_speed: None,
            shutter_secs: None,
            warning: None,
        };

        let settings = match self.camera_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                result.warning = Some(format!("could not read shutter speed: {e}"));
                return result;
            }
        };
        let Some(raw) = settings.shutter_speed() else {
            result.warning = Some("camera did not report a shutter speed".into());
            return result;
        };
        result.shutter_speed = Some(raw.to_owned());

        let Some(exposure) = parse_shutter_speed(raw) else {
            result.warning = Some(format!("could not parse shutter speed {raw:?}"));
            return result;
        };
        result.shutter_secs = Some(exposure);

        if interval_secs <= exposure {
            result.valid = false;
            result.warning = Some(format!(
                "interval {interval_secs}s must be longer than the shutter speed {raw} ({exposure}s)"
            ));
        }
        result
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn health_task(controller: CameraController, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let paused = controller.inner.monitoring_paused.load(Ordering::Relaxed);
                if !paused && controller.check_health().await == HealthOutcome::Disconnected {
                    break;
                }
            }
        }
    }
}

/// Settings refresh. Failures are logged only and never count toward the
/// health failure threshold.
async fn info_poll_task(controller: CameraController, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let paused = controller.inner.polling_paused.load(Ordering::Relaxed);
                if !paused && controller.is_connected() {
                    controller.refresh_settings().await;
                }
            }
        }
    }
}
