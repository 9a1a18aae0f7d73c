//! Proximity event command handlers.

use geoentry_core::{
    ApiClient, CreateProximityEvent, Dashboard, ProximityEvent, ProximityEventFilter,
    UpdateProximityEvent,
};
use tabled::Tabled;

use crate::cli::{EventsArgs, EventsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Type")]
    etype: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Distance")]
    distance: String,
}

fn distance(e: &ProximityEvent) -> String {
    e.distance_meters
        .map_or_else(|| "-".into(), |d| format!("{d:.0} m"))
}

impl From<&ProximityEvent> for EventRow {
    fn from(e: &ProximityEvent) -> Self {
        Self {
            id: e.id.to_string(),
            time: e.occurred_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            etype: e.event_type.to_string(),
            device: e.device_id.to_string(),
            location: util::or_dash(e.location_id.as_ref()),
            distance: distance(e),
        }
    }
}

fn detail(e: &ProximityEvent) -> String {
    [
        format!("ID:       {}", e.id),
        format!("Type:     {}", e.event_type),
        format!("Time:     {}", e.occurred_at.to_rfc3339()),
        format!("Device:   {}", e.device_id),
        format!("Location: {}", util::or_dash(e.location_id.as_ref())),
        format!("Distance: {}", distance(e)),
    ]
    .join("\n")
}

pub async fn handle(
    dashboard: &Dashboard<ApiClient>,
    args: EventsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let queries = dashboard.queries();

    match args.command {
        EventsCommand::List {
            device,
            location,
            limit,
        } => {
            let events = queries
                .proximity_events(&ProximityEventFilter {
                    device_id: device,
                    location_id: location,
                    limit,
                })
                .await
                .into_result()?;
            let out = output::render_list(
                &global.output,
                events.as_slice(),
                |e| EventRow::from(e),
                |e| e.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        EventsCommand::Get { id } => {
            let event = queries.proximity_event(&id).await.into_result()?;
            let out = output::render_single(&global.output, event.as_ref(), detail, |e| {
                e.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        EventsCommand::Create {
            device,
            location,
            event_type,
            distance,
        } => {
            let created = queries
                .create_proximity_event(&CreateProximityEvent {
                    device_id: device,
                    location_id: location,
                    event_type: event_type.into(),
                    distance_meters: distance,
                })
                .await?;
            let out =
                output::render_single(&global.output, &created, detail, |e| e.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        EventsCommand::Update {
            id,
            location,
            event_type,
            distance,
        } => {
            let body = UpdateProximityEvent {
                location_id: location,
                event_type: event_type.map(Into::into),
                distance_meters: distance,
            };
            util::require_changes(
                body.location_id.is_some()
                    || body.event_type.is_some()
                    || body.distance_meters.is_some(),
            )?;
            let updated = queries.update_proximity_event(&id, &body).await?;
            let out =
                output::render_single(&global.output, &updated, detail, |e| e.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        EventsCommand::Delete { id } => {
            if !util::confirm(&format!("Delete proximity event {id}?"), global.yes)? {
                return Ok(());
            }
            queries.delete_proximity_event(&id).await?;
            Ok(())
        }
    }
}
