//! Command dispatch: bridges CLI args -> core calls -> output formatting.

pub mod config_cmd;
pub mod datetime;
pub mod discover;
pub mod info;
pub mod settings;
pub mod shoot;
pub mod util;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Context;
use crate::error::CliError;

use self::util::CameraSession;

/// Dispatch a command that needs resolved config.
///
/// Camera-bound commands open a session first and always release it, even
/// when the handler fails.
pub async fn dispatch(cmd: Command, global: &GlobalOpts, ctx: &Context) -> Result<(), CliError> {
    let cmd = match cmd {
        Command::Discover(args) => return discover::handle(args, global, ctx).await,
        Command::Watch(args) => return watch::handle(args, global, ctx).await,
        other => other,
    };

    let session = CameraSession::open(global, ctx).await?;
    let result = match cmd {
        Command::Info => info::handle_info(&session, ctx).await,
        Command::Status => info::handle_status(&session, ctx).await,
        Command::Settings(args) => settings::handle_list(&session, args, ctx).await,
        Command::Set(args) => settings::handle_set(&session, args, ctx).await,
        Command::Shoot(args) => shoot::handle(&session, args, ctx).await,
        Command::Datetime(args) => datetime::handle(&session, args, ctx).await,
        // Handled before a session is opened
        Command::Discover(_) | Command::Watch(_) | Command::Config(_) | Command::Completions(_) => {
            Ok(())
        }
    };
    session.close().await;
    result
}
