//! Discovery command handlers.

use std::time::Duration;

use tabled::Tabled;

use camlink_core::DeviceDescriptor;

use crate::cli::{DiscoverArgs, GlobalOpts, OutputFormat};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct CameraRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "In Use")]
    in_use: String,
    #[tabled(rename = "UUID")]
    uuid: String,
}

impl From<&DeviceDescriptor> for CameraRow {
    fn from(d: &DeviceDescriptor) -> Self {
        Self {
            name: d.label().to_owned(),
            model: d.model_name.clone().unwrap_or_default(),
            address: d.address().to_string(),
            serial: d.serial_number.clone().unwrap_or_default(),
            in_use: if d.on_service { "yes" } else { "no" }.into(),
            uuid: d.uuid.clone(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: DiscoverArgs,
    global: &GlobalOpts,
    ctx: &Context,
) -> Result<(), CliError> {
    let listener = util::start_listener(global, ctx).await?;
    let spinner = util::spinner("Listening for camera advertisements...", ctx.quiet);
    tokio::time::sleep(Duration::from_secs(args.wait)).await;
    spinner.finish_and_clear();

    let mut cameras = listener.discovered();
    listener.stop_discovery().await;
    cameras.sort_by(|a, b| a.label().cmp(b.label()));

    if cameras.is_empty() && ctx.output == OutputFormat::Table {
        if !ctx.quiet {
            eprintln!("No cameras found after {}s", args.wait);
        }
        return Ok(());
    }

    let out = output::render_list(
        ctx.output,
        &cameras,
        |d| CameraRow::from(d),
        |d| d.control_url.to_string(),
    );
    output::print_output(&out, ctx.quiet);
    Ok(())
}
