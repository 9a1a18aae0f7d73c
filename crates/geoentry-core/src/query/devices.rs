// Device queries and mutations.

use std::sync::Arc;

use geoentry_api::{CreateDevice, Device, DeviceFilter, ResourceId, UpdateDevice};

use super::{MutationAction, Queries};
use crate::cache::{CacheKey, QueryState, ResourceKind};
use crate::error::CoreError;
use crate::remote::RemoteData;

impl<R: RemoteData> Queries<R> {
    /// Devices of the signed-in user.
    pub async fn devices(&self) -> QueryState<Vec<Device>> {
        self.list_devices(None).await
    }

    /// Devices of the signed-in user assigned to `location`.
    pub async fn devices_at_location(&self, location: &ResourceId) -> QueryState<Vec<Device>> {
        self.list_devices(Some(location)).await
    }

    async fn list_devices(&self, location: Option<&ResourceId>) -> QueryState<Vec<Device>> {
        let Some(user) = self.current_user_id() else {
            return QueryState::disabled();
        };

        let mut key = CacheKey::collection(ResourceKind::Devices);
        if let Some(location) = location {
            key = key.scoped("location", location);
        }
        let filter = DeviceFilter {
            user_id: Some(user),
            location_id: location.cloned(),
        };

        self.read(key, move |remote: Arc<R>| {
            let filter = filter.clone();
            async move { remote.list_devices(&filter).await }
        })
        .await
    }

    pub async fn device(&self, id: &ResourceId) -> QueryState<Device> {
        let key = CacheKey::item(ResourceKind::Devices, id.clone());
        let id = id.clone();
        self.read(key, move |remote: Arc<R>| {
            let id = id.clone();
            async move { remote.get_device(&id).await }
        })
        .await
    }

    pub async fn create_device(&self, body: &CreateDevice) -> Result<Device, CoreError> {
        self.mutate(
            ResourceKind::Devices,
            MutationAction::Create,
            None,
            self.remote.create_device(body),
        )
        .await
    }

    pub async fn update_device(
        &self,
        id: &ResourceId,
        body: &UpdateDevice,
    ) -> Result<Device, CoreError> {
        self.mutate(
            ResourceKind::Devices,
            MutationAction::Update,
            Some(id),
            self.remote.update_device(id, body),
        )
        .await
    }

    pub async fn delete_device(&self, id: &ResourceId) -> Result<(), CoreError> {
        self.mutate(
            ResourceKind::Devices,
            MutationAction::Delete,
            Some(id),
            self.remote.delete_device(id),
        )
        .await
    }
}
