//! Shared helpers for command handlers.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use camlink_core::{
    CameraController, CameraStateManager, CoreError, DeviceDescriptor, DiscoveryEvent,
    DiscoveryListener, ManagerConfig,
};

use crate::cli::GlobalOpts;
use crate::config::{self, Context, FileLastIpStore};
use crate::error::CliError;

/// A connected primary camera plus the manager that owns it.
pub struct CameraSession {
    pub manager: CameraStateManager,
    pub controller: CameraController,
}

impl CameraSession {
    /// Connect to `--ip`, or to the first camera found by discovery, or to
    /// the last address that worked.
    pub async fn open(global: &GlobalOpts, ctx: &Context) -> Result<Self, CliError> {
        let manager = new_manager(ctx, false);
        manager.initialize().await;

        let controller = match global.ip {
            Some(ip) => connect_ip(&manager, ip, global.port).await?,
            None => match discover_first(global, ctx).await? {
                Some(descriptor) => {
                    let identity = descriptor.uuid.clone();
                    let address = descriptor.address().to_string();
                    manager.register_camera(descriptor).await?;
                    manager
                        .connect_to_camera(&identity)
                        .await
                        .map_err(|e| connect_error(address, e))?
                }
                None => {
                    let Some(ip) = last_ip(&manager) else {
                        return Err(CliError::NoCamera {
                            seconds: global.discover_timeout,
                        });
                    };
                    info!(%ip, "no camera advertised, trying last known address");
                    connect_ip(&manager, ip, global.port).await?
                }
            },
        };

        Ok(Self {
            manager,
            controller,
        })
    }

    /// Release the camera and stop all background tasks.
    pub async fn close(self) {
        self.manager.cleanup().await;
    }
}

/// State manager wired to the file-backed last-IP store when enabled.
pub fn new_manager(ctx: &Context, auto_connect: bool) -> CameraStateManager {
    let config = ManagerConfig {
        auto_connect,
        ..ctx.config.manager_config()
    };
    if ctx.config.state.remember_last_ip {
        CameraStateManager::with_last_ip_store(config, Arc::new(FileLastIpStore::in_data_dir()))
    } else {
        CameraStateManager::new(config)
    }
}

/// Start a listener on the `--interface` list (or the default interface).
pub async fn start_listener(
    global: &GlobalOpts,
    ctx: &Context,
) -> Result<DiscoveryListener, CliError> {
    let interfaces = config::parse_interfaces(&global.interfaces)?;
    let listener = DiscoveryListener::new(ctx.config.discovery_config())?;
    listener.start_discovery(&interfaces).await?;
    Ok(listener)
}

async fn discover_first(
    global: &GlobalOpts,
    ctx: &Context,
) -> Result<Option<DeviceDescriptor>, CliError> {
    let listener = start_listener(global, ctx).await?;
    let mut events = listener.subscribe();
    let spinner = spinner("Searching for cameras...", ctx.quiet);

    let wait = Duration::from_secs(global.discover_timeout);
    let found = tokio::time::timeout(wait, async {
        loop {
            match events.recv().await {
                Ok(DiscoveryEvent::CameraDiscovered { descriptor }) => return Some(*descriptor),
                Ok(DiscoveryEvent::DeviceOffline { .. }) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten();

    spinner.finish_and_clear();
    listener.stop_discovery().await;
    debug!(found = found.is_some(), "discovery finished");
    Ok(found)
}

async fn connect_ip(
    manager: &CameraStateManager,
    ip: IpAddr,
    port: u16,
) -> Result<CameraController, CliError> {
    manager
        .connect_to_ip(ip, port)
        .await
        .map_err(|e| connect_error(format!("{ip}:{port}"), e))
}

fn last_ip(manager: &CameraStateManager) -> Option<IpAddr> {
    manager.last_successful_ip()?.parse().ok()
}

fn connect_error(address: String, err: CoreError) -> CliError {
    match err {
        CoreError::DeviceNeedsRestart { .. } => err.into(),
        source => CliError::ConnectionFailed { address, source },
    }
}

/// Spinner on stderr; hidden in quiet mode.
pub fn spinner(message: &'static str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Parse a command-line value as JSON, falling back to a plain string.
///
/// `1/250` is not valid JSON, so shutter speeds stay strings while `true`
/// or `100` keep their JSON type.
pub fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn values_keep_json_types_when_possible() {
        assert_eq!(parse_value("1/250"), json!("1/250"));
        assert_eq!(parse_value("f8.0"), json!("f8.0"));
        assert_eq!(parse_value("100"), json!(100));
        assert_eq!(parse_value("\"auto\""), json!("auto"));
        assert_eq!(parse_value("true"), json!(true));
    }
}
