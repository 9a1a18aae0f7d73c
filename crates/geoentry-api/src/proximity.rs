// Proximity event endpoints
//
// Events are normally produced by devices themselves; create/update/delete
// exist for manual corrections from the dashboard.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::{
    CreateProximityEvent, ProximityEvent, ProximityEventFilter, ResourceId, UpdateProximityEvent,
};

impl ApiClient {
    /// `GET proximity-events` with optional device/location/limit filters.
    pub async fn list_proximity_events(
        &self,
        filter: &ProximityEventFilter,
    ) -> Result<Vec<ProximityEvent>, Error> {
        self.get_with_params("proximity-events", &filter.query_params())
            .await
    }

    /// `GET proximity-events/{id}`
    pub async fn get_proximity_event(&self, id: &ResourceId) -> Result<ProximityEvent, Error> {
        self.get(&format!("proximity-events/{id}"))
            .await
            .map_err(|e| e.into_not_found("proximity event", id))
    }

    /// `POST proximity-events`
    pub async fn create_proximity_event(
        &self,
        body: &CreateProximityEvent,
    ) -> Result<ProximityEvent, Error> {
        debug!(device_id = %body.device_id, event_type = %body.event_type, "recording proximity event");
        self.post("proximity-events", body).await
    }

    /// `PUT proximity-events/{id}`
    pub async fn update_proximity_event(
        &self,
        id: &ResourceId,
        body: &UpdateProximityEvent,
    ) -> Result<ProximityEvent, Error> {
        debug!(%id, "updating proximity event");
        self.put(&format!("proximity-events/{id}"), body)
            .await
            .map_err(|e| e.into_not_found("proximity event", id))
    }

    /// `DELETE proximity-events/{id}`
    pub async fn delete_proximity_event(&self, id: &ResourceId) -> Result<(), Error> {
        debug!(%id, "deleting proximity event");
        self.delete(&format!("proximity-events/{id}"))
            .await
            .map_err(|e| e.into_not_found("proximity event", id))
    }
}
