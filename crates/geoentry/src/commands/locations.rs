//! Location command handlers.

use geoentry_core::{ApiClient, CreateLocation, Dashboard, Location, UpdateLocation};
use tabled::Tabled;

use crate::cli::{GlobalOpts, LocationsArgs, LocationsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Center")]
    center: String,
    #[tabled(rename = "Radius")]
    radius: String,
    #[tabled(rename = "Default")]
    default: String,
}

impl From<&Location> for LocationRow {
    fn from(l: &Location) -> Self {
        Self {
            id: l.id.to_string(),
            name: l.name.clone(),
            center: format!("{:.5}, {:.5}", l.latitude, l.longitude),
            radius: format!("{:.0} m", l.radius_meters),
            default: if l.is_default { "*" } else { "" }.into(),
        }
    }
}

fn detail(l: &Location) -> String {
    [
        format!("ID:      {}", l.id),
        format!("Name:    {}", l.name),
        format!("Address: {}", util::or_dash(l.address.as_deref())),
        format!("Center:  {:.6}, {:.6}", l.latitude, l.longitude),
        format!("Radius:  {:.0} m", l.radius_meters),
        format!("Default: {}", l.is_default),
    ]
    .join("\n")
}

fn validate_geofence(
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius: Option<f64>,
) -> Result<(), CliError> {
    if latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
        return Err(CliError::Validation {
            field: "latitude".into(),
            reason: "must be between -90 and 90".into(),
        });
    }
    if longitude.is_some_and(|lon| !(-180.0..=180.0).contains(&lon)) {
        return Err(CliError::Validation {
            field: "longitude".into(),
            reason: "must be between -180 and 180".into(),
        });
    }
    if radius.is_some_and(|r| r <= 0.0 || !r.is_finite()) {
        return Err(CliError::Validation {
            field: "radius".into(),
            reason: "must be a positive number of meters".into(),
        });
    }
    Ok(())
}

pub async fn handle(
    dashboard: &Dashboard<ApiClient>,
    args: LocationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let queries = dashboard.queries();

    match args.command {
        LocationsCommand::List => {
            let locations = queries.locations().await.into_result()?;
            let out = output::render_list(
                &global.output,
                locations.as_slice(),
                |l| LocationRow::from(l),
                |l| l.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LocationsCommand::Get { id } => {
            let location = queries.location(&id).await.into_result()?;
            let out = output::render_single(&global.output, location.as_ref(), detail, |l| {
                l.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LocationsCommand::Create {
            name,
            address,
            latitude,
            longitude,
            radius,
            default,
        } => {
            validate_geofence(Some(latitude), Some(longitude), Some(radius))?;
            let created = queries
                .create_location(&CreateLocation {
                    name,
                    address,
                    latitude,
                    longitude,
                    radius_meters: radius,
                    is_default: default.then_some(true),
                })
                .await?;
            let out =
                output::render_single(&global.output, &created, detail, |l| l.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LocationsCommand::Update {
            id,
            name,
            address,
            latitude,
            longitude,
            radius,
            default,
        } => {
            validate_geofence(latitude, longitude, radius)?;
            let body = UpdateLocation {
                name,
                address,
                latitude,
                longitude,
                radius_meters: radius,
                is_default: default,
            };
            util::require_changes(
                body.name.is_some()
                    || body.address.is_some()
                    || body.latitude.is_some()
                    || body.longitude.is_some()
                    || body.radius_meters.is_some()
                    || body.is_default.is_some(),
            )?;
            let updated = queries.update_location(&id, &body).await?;
            let out =
                output::render_single(&global.output, &updated, detail, |l| l.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LocationsCommand::Delete { id } => {
            if !util::confirm(
                &format!("Delete location {id}? Devices there become unassigned."),
                global.yes,
            )? {
                return Ok(());
            }
            queries.delete_location(&id).await?;
            Ok(())
        }
    }
}
