//! Device command handlers.

use geoentry_core::{ApiClient, CreateDevice, Dashboard, Device, UpdateDevice};
use tabled::Tabled;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Battery")]
    battery: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            dtype: d.device_type.clone(),
            location: util::or_dash(d.location_id.as_ref()),
            active: if d.is_active { "yes" } else { "no" }.into(),
            battery: d
                .battery_level
                .map_or_else(|| "-".into(), |b| format!("{b}%")),
        }
    }
}

fn detail(d: &Device) -> String {
    [
        format!("ID:        {}", d.id),
        format!("Name:      {}", d.name),
        format!("Type:      {}", d.device_type),
        format!("Location:  {}", util::or_dash(d.location_id.as_ref())),
        format!("Active:    {}", d.is_active),
        format!(
            "Battery:   {}",
            d.battery_level
                .map_or_else(|| "-".into(), |b| format!("{b}%"))
        ),
        format!(
            "Last seen: {}",
            util::or_dash(d.last_seen.map(|t| t.to_rfc3339()))
        ),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard<ApiClient>,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let queries = dashboard.queries();

    match args.command {
        DevicesCommand::List { location } => {
            let state = match location {
                Some(ref location) => queries.devices_at_location(location).await,
                None => queries.devices().await,
            };
            let devices = state.into_result()?;
            let out = output::render_list(
                &global.output,
                devices.as_slice(),
                |d| DeviceRow::from(d),
                |d| d.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { id } => {
            let device = queries.device(&id).await.into_result()?;
            let out =
                output::render_single(&global.output, device.as_ref(), detail, |d| d.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Create {
            name,
            device_type,
            location,
            inactive,
        } => {
            let created = queries
                .create_device(&CreateDevice {
                    name,
                    device_type,
                    location_id: location,
                    is_active: inactive.then_some(false),
                })
                .await?;
            let out =
                output::render_single(&global.output, &created, detail, |d| d.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Update {
            id,
            name,
            device_type,
            location,
            active,
        } => {
            let body = UpdateDevice {
                name,
                device_type,
                location_id: location,
                is_active: active,
            };
            util::require_changes(
                body.name.is_some()
                    || body.device_type.is_some()
                    || body.location_id.is_some()
                    || body.is_active.is_some(),
            )?;
            let updated = queries.update_device(&id, &body).await?;
            let out =
                output::render_single(&global.output, &updated, detail, |d| d.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Delete { id } => {
            if !util::confirm(&format!("Delete device {id}?"), global.yes)? {
                return Ok(());
            }
            queries.delete_device(&id).await?;
            Ok(())
        }
    }
}
