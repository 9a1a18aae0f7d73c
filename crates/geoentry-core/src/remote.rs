// ── Remote data source ──
//
// The operations the dashboard needs from the server. `ApiClient` is the
// production implementation; tests substitute an in-memory one.

use std::future::Future;

use geoentry_api::{
    ApiClient, CreateDevice, CreateLocation, CreateProximityEvent, DashboardStats, Device,
    DeviceFilter, Error, HealthStatus, Location, LocationFilter, LoginGrant, ProximityEvent,
    ProximityEventFilter, ResourceId, UpdateDevice, UpdateLocation, UpdateProximityEvent, User,
};
use secrecy::SecretString;

/// Server operations behind the query layer.
pub trait RemoteData: Send + Sync + 'static {
    // ── Session ──────────────────────────────────────────────────────

    fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<LoginGrant, Error>> + Send;

    fn logout(&self) -> impl Future<Output = Result<(), Error>> + Send;

    fn get_profile(&self) -> impl Future<Output = Result<User, Error>> + Send;

    /// Install or clear the credential used for later calls.
    fn set_token(&self, token: Option<SecretString>);

    // ── Devices ──────────────────────────────────────────────────────

    fn list_devices(
        &self,
        filter: &DeviceFilter,
    ) -> impl Future<Output = Result<Vec<Device>, Error>> + Send;

    fn get_device(&self, id: &ResourceId) -> impl Future<Output = Result<Device, Error>> + Send;

    fn create_device(
        &self,
        body: &CreateDevice,
    ) -> impl Future<Output = Result<Device, Error>> + Send;

    fn update_device(
        &self,
        id: &ResourceId,
        body: &UpdateDevice,
    ) -> impl Future<Output = Result<Device, Error>> + Send;

    fn delete_device(&self, id: &ResourceId) -> impl Future<Output = Result<(), Error>> + Send;

    // ── Locations ────────────────────────────────────────────────────

    fn list_locations(
        &self,
        filter: &LocationFilter,
    ) -> impl Future<Output = Result<Vec<Location>, Error>> + Send;

    fn get_location(
        &self,
        id: &ResourceId,
    ) -> impl Future<Output = Result<Location, Error>> + Send;

    fn create_location(
        &self,
        body: &CreateLocation,
    ) -> impl Future<Output = Result<Location, Error>> + Send;

    fn update_location(
        &self,
        id: &ResourceId,
        body: &UpdateLocation,
    ) -> impl Future<Output = Result<Location, Error>> + Send;

    fn delete_location(&self, id: &ResourceId) -> impl Future<Output = Result<(), Error>> + Send;

    // ── Proximity events ─────────────────────────────────────────────

    fn list_proximity_events(
        &self,
        filter: &ProximityEventFilter,
    ) -> impl Future<Output = Result<Vec<ProximityEvent>, Error>> + Send;

    fn get_proximity_event(
        &self,
        id: &ResourceId,
    ) -> impl Future<Output = Result<ProximityEvent, Error>> + Send;

    fn create_proximity_event(
        &self,
        body: &CreateProximityEvent,
    ) -> impl Future<Output = Result<ProximityEvent, Error>> + Send;

    fn update_proximity_event(
        &self,
        id: &ResourceId,
        body: &UpdateProximityEvent,
    ) -> impl Future<Output = Result<ProximityEvent, Error>> + Send;

    fn delete_proximity_event(
        &self,
        id: &ResourceId,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    // ── Aggregates ───────────────────────────────────────────────────

    fn get_dashboard_stats(&self) -> impl Future<Output = Result<DashboardStats, Error>> + Send;

    fn get_health(&self) -> impl Future<Output = Result<HealthStatus, Error>> + Send;
}

impl RemoteData for ApiClient {
    async fn login(&self, email: &str, password: &SecretString) -> Result<LoginGrant, Error> {
        ApiClient::login(self, email, password).await
    }

    async fn logout(&self) -> Result<(), Error> {
        ApiClient::logout(self).await
    }

    async fn get_profile(&self) -> Result<User, Error> {
        ApiClient::get_profile(self).await
    }

    fn set_token(&self, token: Option<SecretString>) {
        ApiClient::set_token(self, token);
    }

    async fn list_devices(&self, filter: &DeviceFilter) -> Result<Vec<Device>, Error> {
        ApiClient::list_devices(self, filter).await
    }

    async fn get_device(&self, id: &ResourceId) -> Result<Device, Error> {
        ApiClient::get_device(self, id).await
    }

    async fn create_device(&self, body: &CreateDevice) -> Result<Device, Error> {
        ApiClient::create_device(self, body).await
    }

    async fn update_device(&self, id: &ResourceId, body: &UpdateDevice) -> Result<Device, Error> {
        ApiClient::update_device(self, id, body).await
    }

    async fn delete_device(&self, id: &ResourceId) -> Result<(), Error> {
        ApiClient::delete_device(self, id).await
    }

    async fn list_locations(&self, filter: &LocationFilter) -> Result<Vec<Location>, Error> {
        ApiClient::list_locations(self, filter).await
    }

    async fn get_location(&self, id: &ResourceId) -> Result<Location, Error> {
        ApiClient::get_location(self, id).await
    }

    async fn create_location(&self, body: &CreateLocation) -> Result<Location, Error> {
        ApiClient::create_location(self, body).await
    }

    async fn update_location(
        &self,
        id: &ResourceId,
        body: &UpdateLocation,
    ) -> Result<Location, Error> {
        ApiClient::update_location(self, id, body).await
    }

    async fn delete_location(&self, id: &ResourceId) -> Result<(), Error> {
        ApiClient::delete_location(self, id).await
    }

    async fn list_proximity_events(
        &self,
        filter: &ProximityEventFilter,
    ) -> Result<Vec<ProximityEvent>, Error> {
        ApiClient::list_proximity_events(self, filter).await
    }

    async fn get_proximity_event(&self, id: &ResourceId) -> Result<ProximityEvent, Error> {
        ApiClient::get_proximity_event(self, id).await
    }

    async fn create_proximity_event(
        &self,
        body: &CreateProximityEvent,
    ) -> Result<ProximityEvent, Error> {
        ApiClient::create_proximity_event(self, body).await
    }

    async fn update_proximity_event(
        &self,
        id: &ResourceId,
        body: &UpdateProximityEvent,
    ) -> Result<ProximityEvent, Error> {
        ApiClient::update_proximity_event(self, id, body).await
    }

    async fn delete_proximity_event(&self, id: &ResourceId) -> Result<(), Error> {
        ApiClient::delete_proximity_event(self, id).await
    }

    async fn get_dashboard_stats(&self) -> Result<DashboardStats, Error> {
        ApiClient::get_dashboard_stats(self).await
    }

    async fn get_health(&self) -> Result<HealthStatus, Error> {
        ApiClient::get_health(self).await
    }
}
