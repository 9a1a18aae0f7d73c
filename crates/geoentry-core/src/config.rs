// ── Runtime dashboard configuration ──
//
// Describes how to reach the API and how the cache behaves. Never touches
// disk itself; front ends build a `DashboardConfig` and hand it in.

use std::path::PathBuf;
use std::time::Duration;

use geoentry_api::{TlsMode, TransportConfig};
use url::Url;

use crate::cache::{CachePolicies, DEFAULT_REQUEST_TIMEOUT};
use crate::notify::DEFAULT_NOTIFICATION_CAPACITY;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development servers).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// API base URL (e.g. `https://api.geoentry.example/v1`).
    pub api_url: Url,
    pub tls: TlsVerification,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    pub policies: CachePolicies,
    /// Where the session is persisted. `None` uses the platform data dir.
    pub session_path: Option<PathBuf>,
    pub notification_capacity: usize,
}

impl DashboardConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            tls: TlsVerification::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            policies: CachePolicies::default(),
            session_path: None,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        }
    }
}
