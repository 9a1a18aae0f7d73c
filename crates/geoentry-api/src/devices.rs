// Device endpoints

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::{CreateDevice, Device, DeviceFilter, ResourceId, UpdateDevice};

impl ApiClient {
    /// `GET devices` with optional `user_id` / `location_id` filters.
    pub async fn list_devices(&self, filter: &DeviceFilter) -> Result<Vec<Device>, Error> {
        self.get_with_params("devices", &filter.query_params()).await
    }

    /// `GET devices/{id}`
    pub async fn get_device(&self, id: &ResourceId) -> Result<Device, Error> {
        self.get(&format!("devices/{id}"))
            .await
            .map_err(|e| e.into_not_found("device", id))
    }

    /// `POST devices`
    pub async fn create_device(&self, body: &CreateDevice) -> Result<Device, Error> {
        debug!(name = %body.name, "creating device");
        self.post("devices", body).await
    }

    /// `PUT devices/{id}`
    pub async fn update_device(
        &self,
        id: &ResourceId,
        body: &UpdateDevice,
    ) -> Result<Device, Error> {
        debug!(%id, "updating device");
        self.put(&format!("devices/{id}"), body)
            .await
            .map_err(|e| e.into_not_found("device", id))
    }

    /// `DELETE devices/{id}`
    pub async fn delete_device(&self, id: &ResourceId) -> Result<(), Error> {
        debug!(%id, "deleting device");
        self.delete(&format!("devices/{id}"))
            .await
            .map_err(|e| e.into_not_found("device", id))
    }
}
