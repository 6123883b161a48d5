//! Watch command: run discovery and the state manager, print events.

use std::time::Duration;

use chrono::Local;
use owo_colors::OwoColorize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use camlink_api::ccapi::PollWait;
use camlink_core::{CameraStateManager, ManagerEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

fn describe(event: &ManagerEvent, color: bool) -> String {
    match event {
        ManagerEvent::CameraRegistered {
            identity,
            address,
            method,
        } => format!("registered {identity} at {address} via {method}"),
        ManagerEvent::CameraRemoved {
            identity,
            replaced_by,
        } => match replaced_by {
            Some(by) => format!("removed {identity}, superseded by {by}"),
            None => format!("removed {identity}"),
        },
        ManagerEvent::CameraIpChanged { identity, old, new } => {
            format!("{identity} moved {old} -> {new}")
        }
        ManagerEvent::PrimaryCameraChanged { identity, previous } => match previous {
            Some(previous) => format!("primary camera is now {identity} (was {previous})"),
            None => format!("primary camera is now {identity}"),
        },
        ManagerEvent::PrimaryCameraReconnected { identity, address } => {
            format!("primary {identity} reconnected at {address}")
        }
        ManagerEvent::PrimaryCameraDisconnected {
            identity,
            reason,
            error,
        } => {
            let line = match error {
                Some(error) => format!("primary {identity} disconnected ({reason}): {error}"),
                None => format!("primary {identity} disconnected ({reason})"),
            };
            if color { line.yellow().to_string() } else { line }
        }
        ManagerEvent::CameraConnectionFailed { identity, error } => {
            let line = format!("connection to {identity} failed: {error}");
            if color { line.red().to_string() } else { line }
        }
        ManagerEvent::CameraStatusChanged { identity, status } => {
            format!("{identity} is {}", output::status_label(*status, color))
        }
    }
}

async fn print_events(mut events: broadcast::Receiver<ManagerEvent>, ctx: &Context) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let line = match ctx.output {
                    OutputFormat::Table | OutputFormat::Plain => format!(
                        "{} {}",
                        Local::now().format("%H:%M:%S"),
                        describe(&event, ctx.color)
                    ),
                    // One document per event, so JSON output is line-delimited.
                    _ => output::render_single(
                        OutputFormat::JsonCompact,
                        &event,
                        |_| String::new(),
                        |_| String::new(),
                    ),
                };
                output::print_output(&line, ctx.quiet);
            }
            Err(RecvError::Lagged(n)) => warn!(skipped = n, "event output lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Wait between event polls while there is no primary or a poll failed.
const EVENT_IDLE: Duration = Duration::from_secs(2);

/// Long-poll the current primary and print each batch of changed properties.
async fn print_camera_events(manager: &CameraStateManager, ctx: &Context) {
    loop {
        let Some(controller) = manager.primary_controller().await else {
            tokio::time::sleep(EVENT_IDLE).await;
            continue;
        };
        match controller.poll_events(PollWait::Long).await {
            Ok(events) if events.is_empty() => {}
            Ok(events) => {
                let line = match ctx.output {
                    OutputFormat::Table | OutputFormat::Plain => format!(
                        "{} {} changed: {}",
                        Local::now().format("%H:%M:%S"),
                        controller.identity(),
                        events.names().collect::<Vec<_>>().join(", ")
                    ),
                    _ => output::render_single(
                        OutputFormat::JsonCompact,
                        &events,
                        |_| String::new(),
                        |_| String::new(),
                    ),
                };
                output::print_output(&line, ctx.quiet);
            }
            Err(e) => {
                debug!(error = %e, "event poll failed");
                tokio::time::sleep(EVENT_IDLE).await;
            }
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: WatchArgs, global: &GlobalOpts, ctx: &Context) -> Result<(), CliError> {
    let manager = util::new_manager(ctx, ctx.config.state.auto_connect);
    manager.initialize().await;

    let printer = print_events(manager.subscribe(), ctx);

    let listener = util::start_listener(global, ctx).await?;
    manager.attach_discovery(listener).await;

    if let Some(ip) = global.ip {
        if let Err(e) = manager.connect_to_ip(ip, global.port).await {
            warn!(%ip, error = %e, "initial connect failed");
        }
    }

    let stop = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    };

    let camera_events = async {
        if args.events {
            print_camera_events(&manager, ctx).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = stop => {}
        () = printer => {}
        () = camera_events => {}
    }

    manager.cleanup().await;
    Ok(())
}
