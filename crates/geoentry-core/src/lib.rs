//! Client-side data layer for the GeoEntry dashboard.
//!
//! Sits between `geoentry-api` and UI consumers (the CLI, or any other
//! front end) and decides when server data is re-read:
//!
//! - **[`Dashboard`]**: Facade owning the session lifecycle.
//!   [`login()`](Dashboard::login) persists the session and warms the gated
//!   queries; [`logout()`](Dashboard::logout) invalidates and tears down
//!   everything the session produced.
//!
//! - **[`QueryCache`]**: Keyed store of server responses with per-kind
//!   [`StalenessPolicy`], request deduplication, bounded retry with
//!   exponential backoff, and targeted invalidation.
//!
//! - **[`Queries`]**: Typed reads and writes per resource kind. Writes
//!   never retry; on success they invalidate the affected keys and raise a
//!   [`Toast`].
//!
//! - **[`ReadinessGate`]**: Derives a single `NOT_AUTHENTICATED` /
//!   `LOADING` / `READY` signal from the session, the profile load and the
//!   in-flight device and location queries.

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod notify;
pub mod query;
pub mod readiness;
pub mod remote;
pub mod session;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{
    CacheKey, CachePolicies, DEFAULT_REQUEST_TIMEOUT, EntryInfo, QueryCache, QueryState,
    QueryStatus, RefetchTrigger, ResourceKind, StalenessPolicy,
};
pub use config::{DashboardConfig, TlsVerification};
pub use dashboard::Dashboard;
pub use error::CoreError;
pub use notify::{Notifier, Toast, ToastLevel};
pub use query::{MutationAction, Queries};
pub use readiness::{Readiness, ReadinessGate};
pub use remote::RemoteData;
pub use session::{AuthSession, FileSessionStore, MemorySessionStore, SessionStore};
pub use stats::{DashboardSummary, summarize};

// Wire types consumers need alongside the cache.
pub use geoentry_api::{
    ApiClient, CreateDevice, CreateLocation, CreateProximityEvent, DashboardStats, Device,
    HealthStatus, Location, ProximityEvent, ProximityEventFilter, ProximityEventType, ResourceId,
    Role, UpdateDevice, UpdateLocation, UpdateProximityEvent, User,
};
