// Location (geofence) endpoints

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::{CreateLocation, Location, LocationFilter, ResourceId, UpdateLocation};

impl ApiClient {
    /// `GET locations` with an optional `user_id` filter.
    pub async fn list_locations(&self, filter: &LocationFilter) -> Result<Vec<Location>, Error> {
        self.get_with_params("locations", &filter.query_params())
            .await
    }

    /// `GET locations/{id}`
    pub async fn get_location(&self, id: &ResourceId) -> Result<Location, Error> {
        self.get(&format!("locations/{id}"))
            .await
            .map_err(|e| e.into_not_found("location", id))
    }

    /// `POST locations`
    pub async fn create_location(&self, body: &CreateLocation) -> Result<Location, Error> {
        debug!(name = %body.name, "creating location");
        self.post("locations", body).await
    }

    /// `PUT locations/{id}`
    pub async fn update_location(
        &self,
        id: &ResourceId,
        body: &UpdateLocation,
    ) -> Result<Location, Error> {
        debug!(%id, "updating location");
        self.put(&format!("locations/{id}"), body)
            .await
            .map_err(|e| e.into_not_found("location", id))
    }

    /// `DELETE locations/{id}`
    pub async fn delete_location(&self, id: &ResourceId) -> Result<(), Error> {
        debug!(%id, "deleting location");
        self.delete(&format!("locations/{id}"))
            .await
            .map_err(|e| e.into_not_found("location", id))
    }
}
