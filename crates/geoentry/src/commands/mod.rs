//! Command dispatch: bridges CLI args -> dashboard queries -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod devices;
pub mod events;
pub mod locations;
pub mod stats;
pub mod util;

use geoentry_core::{ApiClient, Dashboard};

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

/// Dispatch an API-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard<ApiClient>,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut toasts = dashboard.notifications();

    let result = match cmd {
        Command::Login(args) => auth::login(dashboard, args, resolved, global).await,
        Command::Logout => auth::logout(dashboard, global).await,
        Command::Status => auth::status(dashboard, global).await,
        Command::Health => stats::health(dashboard, global).await,

        // Everything else needs the stored session
        cmd => match util::require_session(dashboard).await {
            Err(e) => Err(e),
            Ok(()) => match cmd {
                Command::Devices(args) => devices::handle(dashboard, args, global).await,
                Command::Locations(args) => locations::handle(dashboard, args, global).await,
                Command::Events(args) => events::handle(dashboard, args, global).await,
                Command::Stats => stats::handle(dashboard, global).await,
                // Handled above or before dispatch
                Command::Login(_)
                | Command::Logout
                | Command::Status
                | Command::Health
                | Command::Config(_)
                | Command::Completions(_) => unreachable!(),
            },
        },
    };

    output::print_toasts(
        &mut toasts,
        global.quiet,
        output::should_color(&global.color),
    );
    result
}
