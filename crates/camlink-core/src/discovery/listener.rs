// ── SSDP listener ──
//
// One socket bound to the SSDP port with address reuse, joined to the
// multicast group on every usable interface. Two background tasks: a
// periodic M-SEARCH sender and a receive loop that resolves each vendor
// advertisement into a `DeviceDescriptor`.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use camlink_api::ssdp::{
    MULTICAST_ADDR, SERVICE_TYPES, SsdpMessage, build_search, fetch_description, matches_vendor,
    parse_message, uuid_from_usn,
};
use camlink_api::{TlsMode, TransportConfig};
use dashmap::{DashMap, DashSet};
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::DiscoveryEvent;
use crate::config::DiscoveryConfig;
use crate::error::CoreError;
use crate::model::{DeviceDescriptor, NetworkInterface, rank_interfaces};

const EVENT_CHANNEL_SIZE: usize = 64;
const RECV_BUFFER_SIZE: usize = 8192;
const MIN_SEARCH_INTERVAL: Duration = Duration::from_secs(1);
const RECV_BACKOFF_START: Duration = Duration::from_millis(100);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(2);
/// Consecutive receive failures before they are logged as warnings.
const RECV_WARN_AFTER: u32 = 5;

/// A resolved camera and the `LOCATION` it was resolved from.
#[derive(Debug, Clone)]
struct CachedDevice {
    location: String,
    descriptor: DeviceDescriptor,
}

/// SSDP discovery listener.
///
/// Cheaply cloneable; clones share the socket, cache and event channel.
#[derive(Clone)]
pub struct DiscoveryListener {
    inner: Arc<ListenerInner>,
}

struct ListenerInner {
    config: DiscoveryConfig,
    /// Plain-HTTP client for description documents.
    http: reqwest::Client,
    events: broadcast::Sender<DiscoveryEvent>,
    cache: DashMap<String, CachedDevice>,
    /// Identities whose description fetch is in flight.
    pending: DashSet<String>,
    session: Mutex<Option<Session>>,
}

struct Session {
    socket: Arc<UdpSocket>,
    /// Interface addresses the group was joined on.
    groups: Vec<Ipv4Addr>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for DiscoveryListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryListener")
            .field("bind_port", &self.inner.config.bind_port)
            .field("cached", &self.inner.cache.len())
            .finish_non_exhaustive()
    }
}

impl DiscoveryListener {
    pub fn new(config: DiscoveryConfig) -> Result<Self, CoreError> {
        let http = TransportConfig {
            tls: TlsMode::System,
            timeout: config.description_timeout,
            connect_timeout: config.description_timeout,
        }
        .build_client()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(ListenerInner {
                config,
                http,
                events,
                cache: DashMap::new(),
                pending: DashSet::new(),
                session: Mutex::new(None),
            }),
        })
    }

    /// Subscribe to discovery events.
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.inner.events.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    /// Address the running session's socket is bound to.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let session = self.inner.session.lock().await;
        session.as_ref().and_then(|s| s.socket.local_addr().ok())
    }

    /// Snapshot of resolved cameras.
    pub fn discovered(&self) -> Vec<DeviceDescriptor> {
        self.inner
            .cache
            .iter()
            .map(|entry| entry.value().descriptor.clone())
            .collect()
    }

    /// Bind, join the group and start searching. A no-op when already
    /// running.
    ///
    /// Interfaces are joined access point first, WiFi client second, others
    /// last. With no usable interface the group is joined on the default
    /// interface. Fails only when the socket cannot bind or no membership
    /// can be established.
    pub async fn start_discovery(&self, interfaces: &[NetworkInterface]) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;
        if session.is_some() {
            debug!("discovery already running");
            return Ok(());
        }

        let port = self.inner.config.bind_port;
        let socket = bind_socket(port).map_err(|e| CoreError::Discovery {
            message: format!("cannot bind SSDP socket on port {port}: {e}"),
        })?;

        let ranked = rank_interfaces(interfaces);
        let candidates: Vec<(String, Ipv4Addr)> = if ranked.is_empty() {
            vec![("default".to_owned(), Ipv4Addr::UNSPECIFIED)]
        } else {
            ranked.into_iter().map(|i| (i.name, i.ipv4)).collect()
        };

        let mut groups = Vec::with_capacity(candidates.len());
        for (name, ip) in &candidates {
            match socket.join_multicast_v4(MULTICAST_ADDR, *ip) {
                Ok(()) => {
                    debug!(interface = %name, %ip, "joined SSDP group");
                    groups.push(*ip);
                }
                Err(e) => warn!(interface = %name, %ip, error = %e, "cannot join SSDP group"),
            }
        }
        if groups.is_empty() {
            return Err(CoreError::Discovery {
                message: "cannot join the SSDP multicast group on any interface".into(),
            });
        }

        let socket = Arc::new(socket);
        let cancel = CancellationToken::new();
        let handles = vec![
            tokio::spawn(search_task(
                Arc::clone(&self.inner),
                Arc::clone(&socket),
                groups.clone(),
                cancel.clone(),
            )),
            tokio::spawn(receive_task(
                Arc::clone(&self.inner),
                Arc::clone(&socket),
                cancel.clone(),
            )),
        ];

        info!(port, interfaces = groups.len(), "SSDP discovery started");
        *session = Some(Session {
            socket,
            groups,
            cancel,
            handles,
        });
        Ok(())
    }

    /// Cancel both tasks, leave the group, close the socket and clear the
    /// cache. Safe to call repeatedly.
    pub async fn stop_discovery(&self) {
        let Some(session) = self.inner.session.lock().await.take() else {
            return;
        };

        session.cancel.cancel();
        for handle in session.handles {
            let _ = handle.await;
        }
        for ip in &session.groups {
            if let Err(e) = session.socket.leave_multicast_v4(MULTICAST_ADDR, *ip) {
                debug!(%ip, error = %e, "leave SSDP group failed");
            }
        }
        drop(session.socket);

        self.inner.cache.clear();
        self.inner.pending.clear();
        info!("SSDP discovery stopped");
    }

    /// Process one received datagram and return the event it produced, if
    /// any. The event is also broadcast to subscribers.
    pub async fn handle_datagram(&self, datagram: &[u8]) -> Option<DiscoveryEvent> {
        self.inner.handle_datagram(datagram).await
    }
}

impl ListenerInner {
    async fn handle_datagram(&self, datagram: &[u8]) -> Option<DiscoveryEvent> {
        let message = parse_message(datagram)?;
        if message.is_byebye() {
            return self.handle_byebye(&message);
        }
        if !message.is_alive() || !matches_vendor(message.notification_type(), message.usn()) {
            return None;
        }

        let uuid = message.usn().and_then(uuid_from_usn)?;
        let location = message.location()?.to_owned();
        let unchanged = self
            .cache
            .get(&uuid)
            .is_some_and(|cached| cached.location == location);
        if unchanged || !self.pending.insert(uuid.clone()) {
            trace!(%uuid, "advertisement already handled");
            return None;
        }

        let resolved = self.resolve(&uuid, &location).await;
        self.pending.remove(&uuid);
        let descriptor = resolved?;

        info!(
            %uuid,
            address = %descriptor.address(),
            model = descriptor.model_name.as_deref().unwrap_or("unknown"),
            "camera discovered"
        );
        self.cache.insert(
            uuid,
            CachedDevice {
                location,
                descriptor: descriptor.clone(),
            },
        );
        self.emit(DiscoveryEvent::CameraDiscovered {
            descriptor: Box::new(descriptor),
        })
    }

    fn handle_byebye(&self, message: &SsdpMessage) -> Option<DiscoveryEvent> {
        let uuid = message.usn().and_then(uuid_from_usn)?;
        let Some((uuid, _)) = self.cache.remove(&uuid) else {
            trace!(%uuid, "byebye for unknown device");
            return None;
        };
        info!(%uuid, "camera went offline");
        self.emit(DiscoveryEvent::DeviceOffline { uuid })
    }

    /// Fetch and parse the description at `location`. Failures are logged
    /// and skip the candidate.
    async fn resolve(&self, uuid: &str, location: &str) -> Option<DeviceDescriptor> {
        let url = match Url::parse(location) {
            Ok(url) => url,
            Err(e) => {
                debug!(uuid, location, error = %e, "invalid LOCATION header");
                return None;
            }
        };
        let description =
            match fetch_description(&self.http, &url, self.config.description_timeout).await {
                Ok(description) => description,
                Err(e) => {
                    debug!(uuid, %url, error = %e, "description fetch failed");
                    return None;
                }
            };

        let descriptor = DeviceDescriptor::from_description(uuid, &description);
        if descriptor.is_none() {
            debug!(uuid, %url, "description lacks a CCAPI access URL or vendor name");
        }
        descriptor
    }

    fn emit(&self, event: DiscoveryEvent) -> Option<DiscoveryEvent> {
        let _ = self.events.send(event.clone());
        Some(event)
    }
}

fn bind_socket(port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)).into())?;
    UdpSocket::from_std(socket.into())
}

// ── Background tasks ─────────────────────────────────────────────

/// Sends one M-SEARCH per service type per joined interface, immediately
/// and then every `search_interval`.
async fn search_task(
    inner: Arc<ListenerInner>,
    socket: Arc<UdpSocket>,
    groups: Vec<Ipv4Addr>,
    cancel: CancellationToken,
) {
    let period = inner.config.search_interval.max(MIN_SEARCH_INTERVAL);
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => send_searches(&socket, &groups, &inner.config).await,
        }
    }
}

async fn send_searches(socket: &UdpSocket, groups: &[Ipv4Addr], config: &DiscoveryConfig) {
    let target = config.search_target;
    for ip in groups {
        if !ip.is_unspecified() {
            if let Err(e) = SockRef::from(socket).set_multicast_if_v4(ip) {
                debug!(%ip, error = %e, "cannot select multicast interface");
                continue;
            }
        }
        for service_type in SERVICE_TYPES {
            let datagram = build_search(service_type, config.search_mx);
            if let Err(e) = socket.send_to(datagram.as_bytes(), target).await {
                debug!(%ip, error = %e, "M-SEARCH send failed");
            }
        }
    }
    trace!(interfaces = groups.len(), "M-SEARCH round sent");
}

/// Receives datagrams and resolves each on its own task so a slow
/// description fetch never blocks the socket. Repeated receive errors back
/// off instead of spinning.
async fn receive_task(
    inner: Arc<ListenerInner>,
    socket: Arc<UdpSocket>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let mut failures = 0u32;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, from)) => {
                    failures = 0;
                    trace!(%from, len, "SSDP datagram");
                    let datagram = buf[..len].to_vec();
                    let inner = Arc::clone(&inner);
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        tokio::select! {
                            biased;
                            () = cancel.cancelled() => {}
                            _ = inner.handle_datagram(&datagram) => {}
                        }
                    });
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = recv_backoff(failures);
                    if failures >= RECV_WARN_AFTER {
                        warn!(failures, error = %e, ?delay, "SSDP receive keeps failing");
                    } else {
                        debug!(failures, error = %e, "SSDP receive failed");
                    }
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            },
        }
    }
}

/// Delay after the `failures`-th consecutive receive error: doubling from
/// 100 ms, capped at 2 s.
fn recv_backoff(failures: u32) -> Duration {
    let doublings = failures.saturating_sub(1).min(5);
    (RECV_BACKOFF_START * (1 << doublings)).min(RECV_BACKOFF_MAX)
}
