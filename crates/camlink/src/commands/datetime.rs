//! Camera clock command handlers.

use chrono::Local;
use serde::Serialize;

use crate::cli::{DatetimeArgs, DatetimeCommand};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util::CameraSession;

#[derive(Serialize)]
struct ClockReport {
    camera: String,
    dst: bool,
    /// Camera minus host, when the camera's value parses.
    drift_secs: Option<i64>,
}

pub async fn handle(
    session: &CameraSession,
    args: DatetimeArgs,
    ctx: &Context,
) -> Result<(), CliError> {
    let controller = &session.controller;
    match args.command {
        DatetimeCommand::Get => {
            let details = controller.camera_date_time_details().await?;
            let report = ClockReport {
                drift_secs: details
                    .parsed
                    .map(|camera| (camera - Local::now().fixed_offset()).num_seconds()),
                camera: details.datetime,
                dst: details.dst,
            };
            let out = output::render_single(
                ctx.output,
                &report,
                |r| {
                    let mut text = format!("Camera clock: {}", r.camera);
                    if r.dst {
                        text.push_str(" (DST)");
                    }
                    if let Some(drift) = r.drift_secs {
                        text.push_str(&format!("\nDrift:        {drift:+}s"));
                    }
                    text
                },
                |r| r.camera.clone(),
            );
            output::print_output(&out, ctx.quiet);
        }
        DatetimeCommand::Sync => {
            let sent = controller.set_camera_date_time(Local::now()).await?;
            let out = output::render_single(
                ctx.output,
                &sent,
                |s| format!("Camera clock set to {}", s.datetime),
                |s| s.datetime.clone(),
            );
            output::print_output(&out, ctx.quiet);
        }
    }
    Ok(())
}
