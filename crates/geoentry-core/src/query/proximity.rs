// Proximity event queries and mutations.

use std::sync::Arc;

use geoentry_api::{
    CreateProximityEvent, ProximityEvent, ProximityEventFilter, ResourceId, UpdateProximityEvent,
};

use super::{MutationAction, Queries};
use crate::cache::{CacheKey, QueryState, ResourceKind};
use crate::error::CoreError;
use crate::remote::RemoteData;

/// Cache key for a filtered event list: `proximity-events[:device:…][:location:…][:limit:…]`.
fn events_key(filter: &ProximityEventFilter) -> CacheKey {
    let mut key = CacheKey::collection(ResourceKind::ProximityEvents);
    if let Some(ref device) = filter.device_id {
        key = key.scoped("device", device);
    }
    if let Some(ref location) = filter.location_id {
        key = key.scoped("location", location);
    }
    if let Some(limit) = filter.limit {
        key = key.scoped("limit", limit);
    }
    key
}

impl<R: RemoteData> Queries<R> {
    pub async fn proximity_events(
        &self,
        filter: &ProximityEventFilter,
    ) -> QueryState<Vec<ProximityEvent>> {
        let filter = filter.clone();
        self.read(events_key(&filter), move |remote: Arc<R>| {
            let filter = filter.clone();
            async move { remote.list_proximity_events(&filter).await }
        })
        .await
    }

    pub async fn events_for_device(
        &self,
        device: &ResourceId,
        limit: Option<u32>,
    ) -> QueryState<Vec<ProximityEvent>> {
        self.proximity_events(&ProximityEventFilter {
            device_id: Some(device.clone()),
            location_id: None,
            limit,
        })
        .await
    }

    pub async fn events_at_location(
        &self,
        location: &ResourceId,
        limit: Option<u32>,
    ) -> QueryState<Vec<ProximityEvent>> {
        self.proximity_events(&ProximityEventFilter {
            device_id: None,
            location_id: Some(location.clone()),
            limit,
        })
        .await
    }

    pub async fn proximity_event(&self, id: &ResourceId) -> QueryState<ProximityEvent> {
        let key = CacheKey::item(ResourceKind::ProximityEvents, id.clone());
        let id = id.clone();
        self.read(key, move |remote: Arc<R>| {
            let id = id.clone();
            async move { remote.get_proximity_event(&id).await }
        })
        .await
    }

    pub async fn create_proximity_event(
        &self,
        body: &CreateProximityEvent,
    ) -> Result<ProximityEvent, CoreError> {
        self.mutate(
            ResourceKind::ProximityEvents,
            MutationAction::Create,
            None,
            self.remote.create_proximity_event(body),
        )
        .await
    }

    pub async fn update_proximity_event(
        &self,
        id: &ResourceId,
        body: &UpdateProximityEvent,
    ) -> Result<ProximityEvent, CoreError> {
        self.mutate(
            ResourceKind::ProximityEvents,
            MutationAction::Update,
            Some(id),
            self.remote.update_proximity_event(id, body),
        )
        .await
    }

    pub async fn delete_proximity_event(&self, id: &ResourceId) -> Result<(), CoreError> {
        self.mutate(
            ResourceKind::ProximityEvents,
            MutationAction::Delete,
            Some(id),
            self.remote.delete_proximity_event(id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_becomes_scoped_key() {
        let filter = ProximityEventFilter {
            device_id: Some(ResourceId::from(42)),
            location_id: None,
            limit: Some(20),
        };
        assert_eq!(events_key(&filter).path(), "proximity-events:device:42:limit:20");
        assert_eq!(
            events_key(&ProximityEventFilter::default()).path(),
            "proximity-events"
        );
    }
}
