// geoentry-api: Async Rust client for the GeoEntry REST API

pub mod auth;
pub mod client;
mod dashboard;
mod devices;
pub mod error;
mod locations;
mod proximity;
pub mod transport;
pub mod types;

pub use auth::LoginGrant;
pub use client::ApiClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{
    CreateDevice, CreateLocation, CreateProximityEvent, DashboardStats, Device, DeviceFilter,
    HealthStatus, Location, LocationFilter, ProximityEvent, ProximityEventFilter,
    ProximityEventType, ResourceId, Role, UpdateDevice, UpdateLocation, UpdateProximityEvent,
    User,
};
