// Location queries and mutations.

use std::sync::Arc;

use geoentry_api::{CreateLocation, Location, LocationFilter, ResourceId, UpdateLocation};

use super::{MutationAction, Queries};
use crate::cache::{CacheKey, QueryState, ResourceKind};
use crate::error::CoreError;
use crate::remote::RemoteData;

impl<R: RemoteData> Queries<R> {
    /// Locations of the signed-in user.
    pub async fn locations(&self) -> QueryState<Vec<Location>> {
        let Some(user) = self.current_user_id() else {
            return QueryState::disabled();
        };
        let filter = LocationFilter {
            user_id: Some(user),
        };

        self.read(
            CacheKey::collection(ResourceKind::Locations),
            move |remote: Arc<R>| {
                let filter = filter.clone();
                async move { remote.list_locations(&filter).await }
            },
        )
        .await
    }

    pub async fn location(&self, id: &ResourceId) -> QueryState<Location> {
        let key = CacheKey::item(ResourceKind::Locations, id.clone());
        let id = id.clone();
        self.read(key, move |remote: Arc<R>| {
            let id = id.clone();
            async move { remote.get_location(&id).await }
        })
        .await
    }

    pub async fn create_location(&self, body: &CreateLocation) -> Result<Location, CoreError> {
        self.mutate(
            ResourceKind::Locations,
            MutationAction::Create,
            None,
            self.remote.create_location(body),
        )
        .await
    }

    pub async fn update_location(
        &self,
        id: &ResourceId,
        body: &UpdateLocation,
    ) -> Result<Location, CoreError> {
        self.mutate(
            ResourceKind::Locations,
            MutationAction::Update,
            Some(id),
            self.remote.update_location(id, body),
        )
        .await
    }

    /// Delete a location. Device lists are invalidated too, since the
    /// server unassigns devices that pointed at it.
    pub async fn delete_location(&self, id: &ResourceId) -> Result<(), CoreError> {
        self.mutate(
            ResourceKind::Locations,
            MutationAction::Delete,
            Some(id),
            self.remote.delete_location(id),
        )
        .await
    }
}
