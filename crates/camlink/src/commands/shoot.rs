//! Shutter command handler.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use camlink_core::CoreError;

use crate::cli::ShootArgs;
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util::CameraSession;

#[derive(Serialize)]
struct ShotReport {
    taken: u32,
    requested: u32,
    interval_secs: Option<f64>,
    shutter_speed: Option<String>,
}

async fn shoot_once(session: &CameraSession, af: bool) -> Result<(), CoreError> {
    let controller = &session.controller;
    if !af {
        return controller.take_photo().await;
    }
    if !controller.press_shutter(true).await? {
        return Err(CoreError::Shutter {
            message: "camera rejected the shutter press".into(),
        });
    }
    if !controller.release_shutter().await? {
        warn!("shutter release failed after autofocus shot");
    }
    Ok(())
}

pub async fn handle(
    session: &CameraSession,
    args: ShootArgs,
    ctx: &Context,
) -> Result<(), CliError> {
    if args.count == 0 {
        return Err(CliError::Validation {
            field: "count".into(),
            reason: "must be at least 1".into(),
        });
    }

    let mut shutter_speed = None;
    if let Some(interval) = args.interval {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: format!("expected a positive number of seconds, got {interval}"),
            });
        }
        let check = session.controller.validate_interval(interval).await;
        if !check.valid {
            return Err(CliError::IntervalTooShort {
                interval,
                reason: check.warning.unwrap_or_default(),
            });
        }
        if let Some(warning) = &check.warning {
            warn!(%warning, "interval not verified");
        }
        shutter_speed = check.shutter_speed;
    }

    let period = args.interval.map(Duration::from_secs_f64);
    // Heartbeats and settings polls compete with the shutter mid-burst.
    let pause = (args.count > 1).then(|| session.controller.pause_supervision());
    let mut taken = 0;
    for n in 1..=args.count {
        let started = Instant::now();
        shoot_once(session, args.af).await?;
        taken = n;
        info!(shot = n, of = args.count, "photo taken");

        if n < args.count {
            if let Some(period) = period {
                tokio::time::sleep(period.saturating_sub(started.elapsed())).await;
            }
        }
    }
    drop(pause);

    let report = ShotReport {
        taken,
        requested: args.count,
        interval_secs: args.interval,
        shutter_speed,
    };
    let out = output::render_single(
        ctx.output,
        &report,
        |r| format!("Took {} of {} photo(s)", r.taken, r.requested),
        |r| r.taken.to_string(),
    );
    output::print_output(&out, ctx.quiet);
    Ok(())
}
