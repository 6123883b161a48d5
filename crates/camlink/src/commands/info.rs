//! Info and status command handlers.

use serde::Serialize;
use tracing::debug;

use camlink_api::ccapi::{BatteryStatus, DeviceInformation, StorageInfo, Temperature};
use camlink_core::{CameraSummary, ConnectionHistoryEntry, ConnectionStatus, DiscoveryStatus};

use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util::CameraSession;

fn dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

// ── Info ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CameraInfo {
    device: DeviceInformation,
    battery: Option<BatteryStatus>,
    storage: Option<StorageInfo>,
    temperature: Option<Temperature>,
}

fn info_detail(info: &CameraInfo) -> String {
    let d = &info.device;
    let mut lines = vec![
        format!("Manufacturer: {}", dash(d.manufacturer.as_deref())),
        format!("Model:        {}", dash(d.product_name.as_deref())),
        format!("Serial:       {}", dash(d.serial_number.as_deref())),
        format!("Firmware:     {}", dash(d.firmware_version.as_deref())),
        format!("MAC:          {}", dash(d.mac_address.as_deref())),
        format!("GUID:         {}", dash(d.guid.as_deref())),
    ];

    if let Some(battery) = info.battery.as_ref().and_then(BatteryStatus::primary) {
        let mut level = dash(battery.level.as_deref()).to_owned();
        if let Some(quality) = battery.quality.as_deref() {
            level.push_str(&format!(" ({quality})"));
        }
        lines.push(format!("Battery:      {level}"));
    }
    if let Some(storage) = &info.storage {
        for slot in &storage.storages {
            let free = slot.space_size.map_or_else(
                || "-".into(),
                |bytes| format!("{} MiB free", bytes / (1024 * 1024)),
            );
            lines.push(format!(
                "Storage:      {} {free}, {} files",
                dash(slot.name.as_deref()),
                slot.contents_number.unwrap_or(0)
            ));
        }
    }
    if let Some(temp) = &info.temperature {
        lines.push(format!("Temperature:  {}", dash(temp.status.as_deref())));
    }
    lines.join("\n")
}

pub async fn handle_info(session: &CameraSession, ctx: &Context) -> Result<(), CliError> {
    let c = &session.controller;
    let device = c.device_information().await?;

    // Optional endpoints: older bodies lack some of them.
    let battery = c
        .camera_battery()
        .await
        .inspect_err(|e| debug!(error = %e, "no battery status"))
        .ok();
    let storage = c
        .storage_info()
        .await
        .inspect_err(|e| debug!(error = %e, "no storage info"))
        .ok();
    let temperature = c
        .camera_temperature()
        .await
        .inspect_err(|e| debug!(error = %e, "no temperature status"))
        .ok();

    let info = CameraInfo {
        device,
        battery,
        storage,
        temperature,
    };
    let out = output::render_single(ctx.output, &info, info_detail, |i| {
        i.device.serial_number.clone().unwrap_or_default()
    });
    output::print_output(&out, ctx.quiet);
    Ok(())
}

// ── Status ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusReport {
    camera: Option<CameraSummary>,
    connection: ConnectionStatus,
    discovery: DiscoveryStatus,
    history: Vec<ConnectionHistoryEntry>,
}

fn status_detail(report: &StatusReport, color: bool) -> String {
    let c = &report.connection;
    let mut lines = Vec::new();
    if let Some(camera) = &report.camera {
        lines.push(format!("Camera:       {}", camera.descriptor.label()));
        lines.push(format!(
            "Status:       {}",
            output::status_label(camera.status, color)
        ));
    }
    lines.push(format!("Address:      {}", c.address));
    lines.push(format!("Control URL:  {}", c.control_url));
    lines.push(format!("Connection:   {}", c.state));
    lines.push(format!(
        "Shutter:      {}",
        c.shutter.as_ref().map_or_else(|| "-".into(), |s| s.path.clone())
    ));
    lines.push(format!("Endpoints:    {}", c.endpoint_count));
    lines.push(format!("Failures:     {}", c.consecutive_failures));
    if let Some(err) = &c.last_error {
        lines.push(format!("Last error:   {err}"));
    }
    lines.push(format!(
        "Last IP:      {}",
        dash(report.discovery.last_successful_ip.as_deref())
    ));
    for entry in &report.history {
        lines.push(format!(
            "  {} {:<16} {}{}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.event,
            entry.address,
            entry
                .error
                .as_deref()
                .map_or_else(String::new, |e| format!(" ({e})"))
        ));
    }
    lines.join("\n")
}

pub async fn handle_status(session: &CameraSession, ctx: &Context) -> Result<(), CliError> {
    let identity = session.controller.identity().to_owned();
    let report = StatusReport {
        camera: session.manager.camera(&identity).await,
        connection: session.controller.connection_status().await,
        discovery: session.manager.discovery_status().await,
        history: session.manager.connection_history(Some(&identity)).await,
    };
    let out = output::render_single(
        ctx.output,
        &report,
        |r| status_detail(r, ctx.color),
        |r| r.connection.state.to_string(),
    );
    output::print_output(&out, ctx.quiet);
    Ok(())
}
