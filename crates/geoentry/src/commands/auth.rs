//! Session commands: login, logout, status.

use std::io::IsTerminal;

use geoentry_config::ConfigError;
use geoentry_core::{ApiClient, Dashboard, DashboardSummary, User};
use secrecy::SecretString;
use serde::Serialize;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

use super::util;

fn user_detail(u: &User) -> String {
    [
        format!("Email: {}", u.email),
        format!("Name:  {}", util::or_dash(u.name.as_deref())),
        format!("Role:  {}", role_name(u)),
        format!("ID:    {}", u.id),
    ]
    .join("\n")
}

fn role_name(u: &User) -> &'static str {
    match u.role {
        geoentry_core::Role::Admin => "admin",
        geoentry_core::Role::User => "user",
        geoentry_core::Role::Viewer => "viewer",
    }
}

// ── Login ───────────────────────────────────────────────────────────

fn resolve_email(args: &LoginArgs, resolved: &Resolved) -> Result<String, CliError> {
    if let Some(ref email) = args.email {
        return Ok(email.clone());
    }
    if let Some(ref profile) = resolved.profile {
        if let Ok(email) = geoentry_config::resolve_email(profile, &resolved.profile_name) {
            return Ok(email);
        }
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NoCredentials {
            profile: resolved.profile_name.clone(),
        });
    }
    dialoguer::Input::new()
        .with_prompt("Email")
        .interact_text()
        .map_err(util::prompt_err)
}

fn resolve_password(resolved: &Resolved) -> Result<SecretString, CliError> {
    if let Some(ref profile) = resolved.profile {
        match geoentry_config::resolve_password(profile, &resolved.profile_name) {
            Ok(pw) => return Ok(pw),
            Err(ConfigError::NoCredentials { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    } else if let Ok(pw) = std::env::var("GEOENTRY_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    if !std::io::stdin().is_terminal() {
        return Err(CliError::NoCredentials {
            profile: resolved.profile_name.clone(),
        });
    }
    dialoguer::Password::new()
        .with_prompt("Password")
        .interact()
        .map(SecretString::from)
        .map_err(util::prompt_err)
}

pub async fn login(
    dashboard: &Dashboard<ApiClient>,
    args: LoginArgs,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let email = resolve_email(&args, resolved)?;
    let password = resolve_password(resolved)?;

    let user = dashboard.login(&email, &password).await?;

    if !global.quiet {
        eprintln!("Signed in as {}", user.email);
    }
    let out = output::render_single(&global.output, &user, user_detail, |u| u.id.to_string())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Logout ──────────────────────────────────────────────────────────

pub async fn logout(dashboard: &Dashboard<ApiClient>, global: &GlobalOpts) -> Result<(), CliError> {
    if !dashboard.restore().await? {
        if !global.quiet {
            eprintln!("Not signed in");
        }
        return Ok(());
    }
    dashboard.logout().await;
    if !global.quiet {
        eprintln!("Signed out");
    }
    Ok(())
}

// ── Status ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusView {
    signed_in: bool,
    readiness: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<DashboardSummary>,
}

fn status_detail(s: &StatusView) -> String {
    let Some(ref user) = s.user else {
        return format!("Not signed in ({})", s.readiness);
    };
    let mut lines = vec![
        format!("Signed in: {}", user.email),
        format!("Readiness: {}", s.readiness),
    ];
    if let Some(ref summary) = s.summary {
        lines.push(format!(
            "Devices:   {} ({} active, {} unassigned)",
            summary.total_devices, summary.active_devices, summary.unassigned_devices
        ));
        lines.push(format!(
            "Locations: {} ({} default)",
            summary.total_locations, summary.default_locations
        ));
        for (device_type, count) in &summary.devices_by_type {
            lines.push(format!("  {device_type:<12} {count}"));
        }
    }
    lines.join("\n")
}

pub async fn status(dashboard: &Dashboard<ApiClient>, global: &GlobalOpts) -> Result<(), CliError> {
    let signed_in = dashboard.restore().await?;

    let view = if signed_in {
        dashboard.warm_up().await;
        let summary = dashboard.summary().await;
        StatusView {
            signed_in,
            readiness: dashboard.readiness().to_string(),
            user: dashboard.session().map(|s| s.user.clone()),
            summary: Some(DashboardSummary::clone(&summary)),
        }
    } else {
        StatusView {
            signed_in,
            readiness: dashboard.readiness().to_string(),
            user: None,
            summary: None,
        }
    };

    let out = output::render_single(&global.output, &view, status_detail, |s| {
        s.readiness.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
