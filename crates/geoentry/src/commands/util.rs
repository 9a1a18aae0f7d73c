//! Shared helpers for command handlers.

use std::io::IsTerminal;

use geoentry_core::{ApiClient, Dashboard};

use crate::error::CliError;

/// Reinstate the stored session, or fail with `NotSignedIn`.
pub async fn require_session(dashboard: &Dashboard<ApiClient>) -> Result<(), CliError> {
    if dashboard.restore().await? {
        Ok(())
    } else {
        Err(CliError::NotSignedIn)
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Reject an update that would change nothing.
pub fn require_changes(changed: bool) -> Result<(), CliError> {
    if changed {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: "update".into(),
            reason: "nothing to change; pass at least one field flag".into(),
        })
    }
}

/// `-` for absent values in detail views.
pub fn or_dash(value: Option<impl ToString>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}
