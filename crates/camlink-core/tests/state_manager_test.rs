#![allow(clippy::unwrap_used)]
// Integration tests for `CameraStateManager` with wiremock cameras.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::broadcast;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use camlink_api::TransportCode;
use camlink_api::ssdp::DeviceDescription;
use camlink_core::{
    CameraFault, CoreError, CameraStateManager, CameraStatus, ConnectionState, ControllerConfig,
    ControllerStatusUpdate, DeviceDescriptor, DisconnectReason, DiscoveryMethod, HistoryEvent,
    ManagerConfig, ManagerEvent, RegisterOutcome,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(auto_connect: bool) -> ManagerConfig {
    ManagerConfig {
        controller: ControllerConfig {
            request_timeout: Duration::from_secs(2),
            gateway_retry_delay: Duration::from_millis(10),
            health_check_interval: Duration::ZERO,
            info_poll_interval: Duration::ZERO,
            ..ControllerConfig::default()
        },
        auto_connect,
        ..ManagerConfig::default()
    }
}

async fn camera(serial: &str) -> MockServer {
    camera_answering_after(serial, Duration::ZERO).await
}

/// A camera whose capability root takes `delay` to answer.
async fn camera_answering_after(serial: &str, delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ccapi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "ver100": [
                        { "path": "/ccapi/ver100/deviceinformation", "get": true, "post": false, "put": false, "delete": false },
                        { "path": "/ccapi/ver100/shooting/control/shutterbutton", "get": false, "post": true, "put": false, "delete": false }
                    ]
                }))
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ccapi/ver100/deviceinformation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "manufacturer": "Canon",
            "productname": "Canon EOS R50",
            "serialnumber": serial
        })))
        .mount(&server)
        .await;
    server
}

fn ssdp_at(uuid: &str, serial: &str, access_url: &str) -> DeviceDescriptor {
    let description = DeviceDescription {
        manufacturer: Some("Canon".into()),
        model_name: Some("Canon EOS R50".into()),
        serial_number: Some(serial.into()),
        access_url: Some(access_url.into()),
        ..DeviceDescription::default()
    };
    DeviceDescriptor::from_description(uuid, &description).unwrap()
}

fn ssdp_on(uuid: &str, serial: &str, server: &MockServer) -> DeviceDescriptor {
    ssdp_at(uuid, serial, &format!("{}/ccapi/", server.uri()))
}

fn manual_on(serial: &str, server: &MockServer) -> DeviceDescriptor {
    let addr = server.address();
    let mut descriptor = DeviceDescriptor::manual(addr.ip(), addr.port()).unwrap();
    descriptor.control_url = Url::parse(&format!("{}/ccapi", server.uri())).unwrap();
    descriptor.serial_number = Some(serial.into());
    descriptor
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn drain(rx: &mut broadcast::Receiver<ManagerEvent>) -> Vec<ManagerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait up to five seconds for `identity` to report `status`.
async fn wait_for_status(
    rx: &mut broadcast::Receiver<ManagerEvent>,
    identity: &str,
    status: CameraStatus,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(ManagerEvent::CameraStatusChanged {
                identity: id,
                status: s,
            }) = rx.recv().await
            {
                if id == identity && s == status {
                    break;
                }
            }
        }
    })
    .await
    .unwrap();
}

async fn primary_count(manager: &CameraStateManager) -> usize {
    manager
        .all_cameras()
        .await
        .iter()
        .filter(|c| c.is_primary)
        .count()
}

// ── Deduplication tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_registering_same_advertisement_twice_is_idempotent() {
    let manager = CameraStateManager::new(config(false));
    let mut events = manager.subscribe();
    let descriptor = ssdp_at("cam-1", "111", "http://10.0.0.5:8080/ccapi/");

    let first = manager.register_camera(descriptor.clone()).await.unwrap();
    let mut again = descriptor.clone();
    again.discovered_at = chrono::Utc::now();
    let second = manager.register_camera(again).await.unwrap();

    assert_eq!(first, RegisterOutcome::Registered);
    assert_eq!(second, RegisterOutcome::Unchanged);
    assert_eq!(manager.all_cameras().await.len(), 1);

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ManagerEvent::CameraRegistered { identity, .. } if identity == "cam-1"));
}

#[tokio::test]
async fn test_ssdp_record_wins_when_registered_second() {
    let manager = CameraStateManager::new(config(false));
    let mut events = manager.subscribe();

    let mut manual = DeviceDescriptor::manual(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 443).unwrap();
    manual.serial_number = Some("123".into());
    let manual_id = manual.uuid.clone();

    manager.register_camera(manual).await.unwrap();
    let outcome = manager
        .register_camera(ssdp_at("cam-1", "123", "http://10.0.0.7:8080/ccapi/"))
        .await
        .unwrap();
    assert_eq!(outcome, RegisterOutcome::Registered);

    let cameras = manager.all_cameras().await;
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0].identity, "cam-1");
    assert_eq!(cameras[0].descriptor.discovery_method, DiscoveryMethod::Ssdp);

    let removed = drain(&mut events).into_iter().any(|e| {
        e == ManagerEvent::CameraRemoved {
            identity: manual_id.clone(),
            replaced_by: Some("cam-1".into()),
        }
    });
    assert!(removed);
}

#[tokio::test]
async fn test_manual_record_rejected_when_registered_second() {
    let manager = CameraStateManager::new(config(false));
    manager
        .register_camera(ssdp_at("cam-1", "123", "http://10.0.0.7:8080/ccapi/"))
        .await
        .unwrap();

    let mut manual = DeviceDescriptor::manual(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 443).unwrap();
    manual.serial_number = Some("123".into());
    let outcome = manager.register_camera(manual).await.unwrap();

    assert_eq!(
        outcome,
        RegisterOutcome::Rejected {
            existing: "cam-1".into()
        }
    );
    let cameras = manager.all_cameras().await;
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0].identity, "cam-1");
}

#[tokio::test]
async fn test_primary_transfers_to_ssdp_record() {
    let server = camera("123").await;
    let manager = CameraStateManager::new(config(true));

    let manual = manual_on("123", &server);
    let manual_id = manual.uuid.clone();
    manager.register_camera(manual).await.unwrap();
    assert_eq!(
        manager.primary_camera().await.unwrap().identity,
        manual_id
    );

    let mut events = manager.subscribe();
    manager
        .register_camera(ssdp_on("cam-1", "123", &server))
        .await
        .unwrap();

    let primary = manager.primary_camera().await.unwrap();
    assert_eq!(primary.identity, "cam-1");
    assert_eq!(primary.status, CameraStatus::Connected);
    assert_eq!(manager.all_cameras().await.len(), 1);
    assert_eq!(primary_count(&manager).await, 1);

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        ManagerEvent::PrimaryCameraDisconnected { reason: DisconnectReason::Replaced, .. }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        ManagerEvent::PrimaryCameraChanged { identity, .. } if identity == "cam-1"
    )));
}

// ── Auto-connect and primary tests ──────────────────────────────────

#[tokio::test]
async fn test_first_camera_auto_connects() {
    let server = camera("111").await;
    let manager = CameraStateManager::new(config(true));

    manager
        .register_camera(ssdp_on("cam-1", "111", &server))
        .await
        .unwrap();

    let controller = manager.primary_controller().await.unwrap();
    assert_eq!(controller.state(), ConnectionState::Connected);
    assert_eq!(manager.last_successful_ip().as_deref(), Some("127.0.0.1"));

    let history = manager.connection_history(Some("cam-1")).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].event, HistoryEvent::Connected);
}

#[tokio::test]
async fn test_at_most_one_primary() {
    let a = camera("111").await;
    let b = camera("222").await;
    let manager = CameraStateManager::new(config(false));

    manager.register_camera(ssdp_on("cam-a", "111", &a)).await.unwrap();
    manager.register_camera(ssdp_on("cam-b", "222", &b)).await.unwrap();
    assert_eq!(primary_count(&manager).await, 0);

    manager.connect_to_camera("cam-a").await.unwrap();
    assert_eq!(primary_count(&manager).await, 1);

    manager.connect_to_camera("cam-b").await.unwrap();
    assert_eq!(primary_count(&manager).await, 1);
    assert_eq!(manager.primary_camera().await.unwrap().identity, "cam-b");
    assert_eq!(
        manager.camera("cam-a").await.unwrap().status,
        CameraStatus::Disconnected
    );

    assert!(manager.disconnect_primary_camera().await);
    assert_eq!(primary_count(&manager).await, 0);
    assert!(!manager.disconnect_primary_camera().await);
}

#[tokio::test]
async fn test_connect_to_unknown_camera_is_an_error() {
    let manager = CameraStateManager::new(config(false));
    let err = manager.connect_to_camera("nope").await.unwrap_err();
    assert_eq!(
        err,
        CoreError::CameraNotFound {
            identity: "nope".into()
        }
    );
    assert!(manager.all_cameras().await.is_empty());
}

#[tokio::test]
async fn test_failed_connect_is_recorded() {
    let manager = CameraStateManager::new(config(false));
    let mut events = manager.subscribe();
    let port = closed_port();

    let err = manager
        .connect_to_ip(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
        .await
        .unwrap_err();
    assert!(err.is_network());

    let identity = format!("manual-127.0.0.1-{port}");
    let record = manager.camera(&identity).await.unwrap();
    assert_eq!(record.status, CameraStatus::Failed);
    assert!(record.last_error.is_some());
    assert!(manager.primary_camera().await.is_none());

    let history = manager.connection_history(Some(&identity)).await;
    assert_eq!(history.last().unwrap().event, HistoryEvent::Failed);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, ManagerEvent::CameraConnectionFailed { .. })));
}

// ── IP change tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_primary_follows_ip_renewal() {
    let old = camera("111").await;
    let new = camera("111").await;
    let manager = CameraStateManager::new(config(true));

    manager.register_camera(ssdp_on("cam-1", "111", &old)).await.unwrap();
    let mut events = manager.subscribe();

    let outcome = manager
        .register_camera(ssdp_on("cam-1", "111", &new))
        .await
        .unwrap();
    assert_eq!(outcome, RegisterOutcome::Updated);

    let controller = manager.primary_controller().await.unwrap();
    assert_eq!(controller.address(), *new.address());
    assert_eq!(controller.state(), ConnectionState::Connected);

    let cameras = manager.all_cameras().await;
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0].descriptor.address(), *new.address());

    let events = drain(&mut events);
    assert!(events.contains(&ManagerEvent::CameraIpChanged {
        identity: "cam-1".into(),
        old: *old.address(),
        new: *new.address(),
    }));
    assert!(events.contains(&ManagerEvent::PrimaryCameraReconnected {
        identity: "cam-1".into(),
        address: *new.address(),
    }));

    let history: Vec<HistoryEvent> = manager
        .connection_history(Some("cam-1"))
        .await
        .iter()
        .map(|e| e.event)
        .collect();
    assert_eq!(history, vec![HistoryEvent::Connected, HistoryEvent::Reconnected]);
}

#[tokio::test]
async fn test_failed_hot_reconnect_clears_primary() {
    let old = camera("111").await;
    let manager = CameraStateManager::new(config(true));
    manager.register_camera(ssdp_on("cam-1", "111", &old)).await.unwrap();
    let mut events = manager.subscribe();

    let gone = format!("http://127.0.0.1:{}/ccapi/", closed_port());
    manager
        .register_camera(ssdp_at("cam-1", "111", &gone))
        .await
        .unwrap();

    assert!(manager.primary_camera().await.is_none());
    assert_eq!(
        manager.camera("cam-1").await.unwrap().status,
        CameraStatus::Failed
    );
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        ManagerEvent::PrimaryCameraDisconnected { reason: DisconnectReason::ReconnectFailed, .. }
    )));
    let last = manager.connection_history(Some("cam-1")).await;
    assert_eq!(last.last().unwrap().event, HistoryEvent::ReconnectFailed);
}

#[tokio::test]
async fn test_reconnect_requires_primary() {
    let manager = CameraStateManager::new(config(false));
    let err = manager
        .reconnect_primary_camera(IpAddr::V4(Ipv4Addr::LOCALHOST), 443)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::NoPrimaryCamera);
}

// ── Status and lifecycle tests ──────────────────────────────────────

#[tokio::test]
async fn test_controller_disconnect_clears_primary() {
    let server = camera("111").await;
    let manager = CameraStateManager::new(config(true));
    manager.register_camera(ssdp_on("cam-1", "111", &server)).await.unwrap();
    let controller = manager.primary_controller().await.unwrap();
    let mut events = manager.subscribe();

    let fault = CameraFault {
        message: "connection refused".into(),
        status: None,
        code: Some(TransportCode::Refused),
    };

    // A report from some earlier controller is ignored.
    manager
        .handle_controller_status_change(ControllerStatusUpdate {
            identity: "cam-1".into(),
            controller_id: controller.id() + 1000,
            state: ConnectionState::Disconnected,
            fault: Some(fault.clone()),
        })
        .await;
    assert!(manager.primary_camera().await.is_some());

    manager
        .handle_controller_status_change(ControllerStatusUpdate {
            identity: "cam-1".into(),
            controller_id: controller.id(),
            state: ConnectionState::Disconnected,
            fault: Some(fault),
        })
        .await;

    assert!(manager.primary_camera().await.is_none());
    let record = manager.camera("cam-1").await.unwrap();
    assert_eq!(record.status, CameraStatus::Disconnected);
    assert!(record.last_error.is_some());
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        ManagerEvent::PrimaryCameraDisconnected { reason: DisconnectReason::ConnectionLost, .. }
    )));
}

#[tokio::test]
async fn test_offline_and_back() {
    let manager = CameraStateManager::new(config(false));
    let descriptor = ssdp_at("cam-1", "111", "http://10.0.0.5:8080/ccapi/");
    manager.register_camera(descriptor.clone()).await.unwrap();

    assert!(manager.mark_offline("cam-1").await);
    assert!(!manager.mark_offline("unknown").await);
    assert_eq!(
        manager.camera("cam-1").await.unwrap().status,
        CameraStatus::Offline
    );

    let outcome = manager.register_camera(descriptor).await.unwrap();
    assert_eq!(outcome, RegisterOutcome::Updated);
    assert_eq!(
        manager.camera("cam-1").await.unwrap().status,
        CameraStatus::Discovered
    );
}

#[tokio::test]
async fn test_cleanup_clears_registry() {
    let server = camera("111").await;
    let manager = CameraStateManager::new(config(true));
    manager.initialize().await;
    manager.register_camera(ssdp_on("cam-1", "111", &server)).await.unwrap();
    let controller = manager.primary_controller().await.unwrap();

    manager.cleanup().await;
    manager.cleanup().await;

    assert_eq!(controller.state(), ConnectionState::Disconnected);
    assert!(manager.all_cameras().await.is_empty());
    assert!(manager.connection_history(None).await.is_empty());

    let status = manager.discovery_status().await;
    assert_eq!(status.known_cameras, 0);
    assert!(!status.discovery_running);
    assert_eq!(status.primary, None::<String>);
}

#[tokio::test]
async fn test_discovery_status_reports_primary() {
    let server = camera("111").await;
    let manager = CameraStateManager::new(config(true));
    manager.register_camera(ssdp_on("cam-1", "111", &server)).await.unwrap();

    let status = manager.discovery_status().await;
    assert_eq!(status.known_cameras, 1);
    assert_eq!(status.primary.as_deref(), Some("cam-1"));
    assert_eq!(
        status.last_successful_ip.as_deref(),
        Some(server.address().ip().to_string().as_str())
    );
}

// ── Concurrency tests ───────────────────────────────────────────────

#[tokio::test]
async fn test_registry_stays_readable_during_slow_connect() {
    let server = camera_answering_after("111", Duration::from_millis(1500)).await;
    let manager = CameraStateManager::new(config(false));
    manager.register_camera(ssdp_on("cam-1", "111", &server)).await.unwrap();
    let mut events = manager.subscribe();

    let connecting = tokio::spawn({
        let manager = manager.clone();
        async move { manager.connect_to_camera("cam-1").await }
    });
    wait_for_status(&mut events, "cam-1", CameraStatus::Connecting).await;

    let quick = Duration::from_millis(500);
    let cameras = tokio::time::timeout(quick, manager.all_cameras()).await.unwrap();
    assert_eq!(cameras[0].status, CameraStatus::Connecting);
    assert!(tokio::time::timeout(quick, manager.primary_controller())
        .await
        .unwrap()
        .is_none());
    let status = tokio::time::timeout(quick, manager.discovery_status())
        .await
        .unwrap();
    assert_eq!(status.primary, None::<String>);

    // Registration without a follow-up connect does not wait either.
    let outcome = tokio::time::timeout(
        quick,
        manager.register_camera(ssdp_at("cam-2", "222", "http://10.0.0.9:8080/ccapi/")),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(outcome, RegisterOutcome::Registered);

    let controller = connecting.await.unwrap().unwrap();
    assert_eq!(controller.state(), ConnectionState::Connected);
    assert_eq!(manager.primary_camera().await.unwrap().identity, "cam-1");
    assert_eq!(manager.all_cameras().await.len(), 2);
}

#[tokio::test]
async fn test_offline_during_connect_supersedes_it() {
    let server = camera_answering_after("111", Duration::from_millis(800)).await;
    let manager = CameraStateManager::new(config(false));
    manager.register_camera(ssdp_on("cam-1", "111", &server)).await.unwrap();
    let mut events = manager.subscribe();

    let connecting = tokio::spawn({
        let manager = manager.clone();
        async move { manager.connect_to_camera("cam-1").await }
    });
    wait_for_status(&mut events, "cam-1", CameraStatus::Connecting).await;
    assert!(manager.mark_offline("cam-1").await);

    let err = connecting.await.unwrap().unwrap_err();
    assert_eq!(
        err,
        CoreError::Superseded {
            identity: "cam-1".into()
        }
    );
    assert!(manager.primary_camera().await.is_none());
    assert_eq!(
        manager.camera("cam-1").await.unwrap().status,
        CameraStatus::Offline
    );
    assert!(manager.connection_history(Some("cam-1")).await.is_empty());
}

#[tokio::test]
async fn test_heartbeat_failure_clears_primary_through_status_task() {
    let server = camera("111").await;
    let mut cfg = config(true);
    cfg.controller.health_check_interval = Duration::from_millis(50);
    let manager = CameraStateManager::new(cfg);
    manager.initialize().await;
    manager.register_camera(ssdp_on("cam-1", "111", &server)).await.unwrap();
    let controller = manager.primary_controller().await.unwrap();
    let mut events = manager.subscribe();

    // Every heartbeat now answers 404.
    server.reset().await;

    let event = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await;
            if let Ok(event @ ManagerEvent::PrimaryCameraDisconnected { .. }) = event {
                break event;
            }
        }
    })
    .await
    .unwrap();
    assert!(matches!(
        event,
        ManagerEvent::PrimaryCameraDisconnected {
            ref identity,
            reason: DisconnectReason::DeviceError,
            ..
        } if identity == "cam-1"
    ));

    assert_eq!(controller.state(), ConnectionState::Disconnected);
    assert!(manager.primary_camera().await.is_none());
    let record = manager.camera("cam-1").await.unwrap();
    assert_eq!(record.status, CameraStatus::Disconnected);
    assert!(record.last_error.is_some());
    let history = manager.connection_history(Some("cam-1")).await;
    assert_eq!(history.last().unwrap().event, HistoryEvent::Disconnected);

    manager.cleanup().await;
}
