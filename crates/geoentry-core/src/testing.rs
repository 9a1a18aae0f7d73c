// In-memory `RemoteData` for unit tests: call counters, scripted
// failures and optional latency.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use geoentry_api::{
    CreateDevice, CreateLocation, CreateProximityEvent, DashboardStats, Device, DeviceFilter,
    Error, HealthStatus, Location, LocationFilter, LoginGrant, ProximityEvent,
    ProximityEventFilter, ResourceId, Role, UpdateDevice, UpdateLocation, UpdateProximityEvent,
    User,
};
use secrecy::{ExposeSecret, SecretString};

use crate::remote::RemoteData;

pub(crate) const PASSWORD: &str = "correct horse";

#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Unavailable,
    Validation,
    Expired,
}

impl Failure {
    fn into_error(self) -> Error {
        match self {
            Self::Unavailable => Error::Api {
                status: 503,
                message: "service unavailable".into(),
                code: None,
            },
            Self::Validation => Error::Validation {
                message: "name must not be empty".into(),
                field: Some("name".into()),
            },
            Self::Expired => Error::SessionExpired,
        }
    }
}

#[derive(Default)]
struct State {
    devices: Vec<Device>,
    locations: Vec<Location>,
    events: Vec<ProximityEvent>,
    next_id: u64,
    token: Option<String>,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, VecDeque<Failure>>,
}

pub(crate) struct FakeRemote {
    state: Mutex<State>,
    latency: Duration,
}

pub(crate) fn user(id: u64) -> User {
    User {
        id: ResourceId::from(id),
        email: format!("user{id}@example.com"),
        name: Some(format!("User {id}")),
        role: Role::User,
    }
}

pub(crate) fn device(id: u64, owner: u64, location: Option<u64>) -> Device {
    Device {
        id: ResourceId::from(id),
        user_id: ResourceId::from(owner),
        name: format!("device {id}"),
        device_type: "tracker".into(),
        location_id: location.map(ResourceId::from),
        is_active: true,
        battery_level: Some(80),
        last_seen: None,
        created_at: None,
    }
}

pub(crate) fn location(id: u64, owner: u64) -> Location {
    Location {
        id: ResourceId::from(id),
        user_id: ResourceId::from(owner),
        name: format!("location {id}"),
        address: None,
        latitude: 48.85,
        longitude: 2.35,
        radius_meters: 150.0,
        is_default: id == 1,
        created_at: None,
    }
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub(crate) fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
            latency,
        }
    }

    /// Seed with two devices and one location for user 1.
    pub(crate) fn seeded() -> Self {
        let remote = Self::new();
        {
            let mut state = remote.lock();
            state.devices = vec![device(1, 1, Some(1)), device(2, 1, None)];
            state.locations = vec![location(1, 1)];
        }
        remote
    }

    pub(crate) fn calls(&self, op: &str) -> usize {
        self.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub(crate) fn fail_next(&self, op: &'static str, failure: Failure, times: usize) {
        self.lock()
            .failures
            .entry(op)
            .or_default()
            .extend(std::iter::repeat_n(failure, times));
    }

    pub(crate) fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, wait out the latency and pop a scripted failure.
    async fn enter(&self, op: &'static str) -> Result<(), Error> {
        let failure = {
            let mut state = self.lock();
            *state.calls.entry(op).or_default() += 1;
            state.failures.get_mut(op).and_then(VecDeque::pop_front)
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        failure.map_or(Ok(()), |f| Err(f.into_error()))
    }

    fn next_id(&self) -> ResourceId {
        let mut state = self.lock();
        state.next_id += 1;
        ResourceId::from(state.next_id)
    }
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn not_found(resource: &'static str, id: &ResourceId) -> Error {
    Error::NotFound {
        resource,
        id: id.to_string(),
    }
}

impl RemoteData for FakeRemote {
    async fn login(&self, email: &str, password: &SecretString) -> Result<LoginGrant, Error> {
        self.enter("login").await?;
        if password.expose_secret() != PASSWORD {
            return Err(Error::Authentication {
                message: "Invalid credentials".into(),
            });
        }
        let token = format!("token-for-{email}");
        self.lock().token = Some(token.clone());
        Ok(LoginGrant {
            token: SecretString::from(token),
            user: User {
                email: email.to_owned(),
                ..user(1)
            },
        })
    }

    async fn logout(&self) -> Result<(), Error> {
        let result = self.enter("logout").await;
        self.lock().token = None;
        result
    }

    async fn get_profile(&self) -> Result<User, Error> {
        self.enter("get_profile").await?;
        Ok(user(1))
    }

    fn set_token(&self, token: Option<SecretString>) {
        self.lock().token = token.map(|t| t.expose_secret().to_owned());
    }

    async fn list_devices(&self, filter: &DeviceFilter) -> Result<Vec<Device>, Error> {
        self.enter("list_devices").await?;
        Ok(self
            .lock()
            .devices
            .iter()
            .filter(|d| filter.user_id.as_ref().is_none_or(|u| &d.user_id == u))
            .filter(|d| {
                filter
                    .location_id
                    .as_ref()
                    .is_none_or(|l| d.location_id.as_ref() == Some(l))
            })
            .cloned()
            .collect())
    }

    async fn get_device(&self, id: &ResourceId) -> Result<Device, Error> {
        self.enter("get_device").await?;
        self.lock()
            .devices
            .iter()
            .find(|d| &d.id == id)
            .cloned()
            .ok_or_else(|| not_found("device", id))
    }

    async fn create_device(&self, body: &CreateDevice) -> Result<Device, Error> {
        self.enter("create_device").await?;
        let created = Device {
            id: self.next_id(),
            user_id: ResourceId::from(1),
            name: body.name.clone(),
            device_type: body.device_type.clone(),
            location_id: body.location_id.clone(),
            is_active: body.is_active.unwrap_or(true),
            battery_level: None,
            last_seen: None,
            created_at: None,
        };
        self.lock().devices.push(created.clone());
        Ok(created)
    }

    async fn update_device(&self, id: &ResourceId, body: &UpdateDevice) -> Result<Device, Error> {
        self.enter("update_device").await?;
        let mut state = self.lock();
        let device = state
            .devices
            .iter_mut()
            .find(|d| &d.id == id)
            .ok_or_else(|| not_found("device", id))?;
        if let Some(ref name) = body.name {
            device.name.clone_from(name);
        }
        if let Some(active) = body.is_active {
            device.is_active = active;
        }
        Ok(device.clone())
    }

    async fn delete_device(&self, id: &ResourceId) -> Result<(), Error> {
        self.enter("delete_device").await?;
        let mut state = self.lock();
        let before = state.devices.len();
        state.devices.retain(|d| &d.id != id);
        if state.devices.len() == before {
            return Err(not_found("device", id));
        }
        Ok(())
    }

    async fn list_locations(&self, filter: &LocationFilter) -> Result<Vec<Location>, Error> {
        self.enter("list_locations").await?;
        Ok(self
            .lock()
            .locations
            .iter()
            .filter(|l| filter.user_id.as_ref().is_none_or(|u| &l.user_id == u))
            .cloned()
            .collect())
    }

    async fn get_location(&self, id: &ResourceId) -> Result<Location, Error> {
        self.enter("get_location").await?;
        self.lock()
            .locations
            .iter()
            .find(|l| &l.id == id)
            .cloned()
            .ok_or_else(|| not_found("location", id))
    }

    async fn create_location(&self, body: &CreateLocation) -> Result<Location, Error> {
        self.enter("create_location").await?;
        let created = Location {
            id: self.next_id(),
            user_id: ResourceId::from(1),
            name: body.name.clone(),
            address: body.address.clone(),
            latitude: body.latitude,
            longitude: body.longitude,
            radius_meters: body.radius_meters,
            is_default: body.is_default.unwrap_or(false),
            created_at: None,
        };
        self.lock().locations.push(created.clone());
        Ok(created)
    }

    async fn update_location(
        &self,
        id: &ResourceId,
        body: &UpdateLocation,
    ) -> Result<Location, Error> {
        self.enter("update_location").await?;
        let mut state = self.lock();
        let location = state
            .locations
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| not_found("location", id))?;
        if let Some(ref name) = body.name {
            location.name.clone_from(name);
        }
        Ok(location.clone())
    }

    async fn delete_location(&self, id: &ResourceId) -> Result<(), Error> {
        self.enter("delete_location").await?;
        let mut state = self.lock();
        state.locations.retain(|l| &l.id != id);
        for device in &mut state.devices {
            if device.location_id.as_ref() == Some(id) {
                device.location_id = None;
            }
        }
        Ok(())
    }

    async fn list_proximity_events(
        &self,
        filter: &ProximityEventFilter,
    ) -> Result<Vec<ProximityEvent>, Error> {
        self.enter("list_proximity_events").await?;
        let state = self.lock();
        let events = state
            .events
            .iter()
            .filter(|e| filter.device_id.as_ref().is_none_or(|d| &e.device_id == d))
            .filter(|e| {
                filter
                    .location_id
                    .as_ref()
                    .is_none_or(|l| e.location_id.as_ref() == Some(l))
            })
            .cloned();
        Ok(match filter.limit {
            Some(limit) => events.take(usize::try_from(limit).unwrap_or(usize::MAX)).collect(),
            None => events.collect(),
        })
    }

    async fn get_proximity_event(&self, id: &ResourceId) -> Result<ProximityEvent, Error> {
        self.enter("get_proximity_event").await?;
        self.lock()
            .events
            .iter()
            .find(|e| &e.id == id)
            .cloned()
            .ok_or_else(|| not_found("proximity event", id))
    }

    async fn create_proximity_event(
        &self,
        body: &CreateProximityEvent,
    ) -> Result<ProximityEvent, Error> {
        self.enter("create_proximity_event").await?;
        let created = ProximityEvent {
            id: self.next_id(),
            device_id: body.device_id.clone(),
            location_id: body.location_id.clone(),
            event_type: body.event_type,
            distance_meters: body.distance_meters,
            occurred_at: chrono::Utc::now(),
        };
        self.lock().events.push(created.clone());
        Ok(created)
    }

    async fn update_proximity_event(
        &self,
        id: &ResourceId,
        body: &UpdateProximityEvent,
    ) -> Result<ProximityEvent, Error> {
        self.enter("update_proximity_event").await?;
        let mut state = self.lock();
        let event = state
            .events
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| not_found("proximity event", id))?;
        if let Some(event_type) = body.event_type {
            event.event_type = event_type;
        }
        Ok(event.clone())
    }

    async fn delete_proximity_event(&self, id: &ResourceId) -> Result<(), Error> {
        self.enter("delete_proximity_event").await?;
        self.lock().events.retain(|e| &e.id != id);
        Ok(())
    }

    async fn get_dashboard_stats(&self) -> Result<DashboardStats, Error> {
        self.enter("get_dashboard_stats").await?;
        let state = self.lock();
        Ok(DashboardStats {
            total_devices: count(state.devices.len()),
            active_devices: count(state.devices.iter().filter(|d| d.is_active).count()),
            total_locations: count(state.locations.len()),
            events_today: count(state.events.len()),
            last_event_at: None,
        })
    }

    async fn get_health(&self) -> Result<HealthStatus, Error> {
        self.enter("get_health").await?;
        Ok(HealthStatus {
            status: "ok".into(),
            version: Some("test".into()),
            timestamp: None,
        })
    }
}
