//! Server statistics and health.

use geoentry_core::{ApiClient, Dashboard, DashboardStats, HealthStatus};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

fn stats_detail(s: &DashboardStats) -> String {
    [
        format!("Devices:      {} ({} active)", s.total_devices, s.active_devices),
        format!("Locations:    {}", s.total_locations),
        format!("Events today: {}", s.events_today),
        format!(
            "Last event:   {}",
            util::or_dash(s.last_event_at.map(|t| t.to_rfc3339()))
        ),
    ]
    .join("\n")
}

fn health_detail(h: &HealthStatus) -> String {
    [
        format!("Status:  {}", h.status),
        format!("Version: {}", util::or_dash(h.version.as_deref())),
    ]
    .join("\n")
}

pub async fn handle(dashboard: &Dashboard<ApiClient>, global: &GlobalOpts) -> Result<(), CliError> {
    let stats = dashboard.queries().dashboard_stats().await.into_result()?;
    let out = output::render_single(&global.output, stats.as_ref(), stats_detail, |s| {
        s.total_devices.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn health(dashboard: &Dashboard<ApiClient>, global: &GlobalOpts) -> Result<(), CliError> {
    let health = dashboard.queries().health().await.into_result()?;
    let out = output::render_single(&global.output, health.as_ref(), health_detail, |h| {
        h.status.clone()
    })?;
    output::print_output(&out, global.quiet);

    if health.is_healthy() {
        Ok(())
    } else {
        Err(CliError::ApiError {
            message: format!("service reports status '{}'", health.status),
        })
    }
}
