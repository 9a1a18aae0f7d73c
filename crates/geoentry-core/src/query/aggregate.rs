// Server-side aggregates: dashboard stats and service health.

use std::sync::Arc;

use geoentry_api::{DashboardStats, HealthStatus};

use super::Queries;
use crate::cache::{CacheKey, QueryState, ResourceKind};
use crate::remote::RemoteData;

impl<R: RemoteData> Queries<R> {
    /// Counts computed by the server for the signed-in user.
    pub async fn dashboard_stats(&self) -> QueryState<DashboardStats> {
        self.read(
            CacheKey::collection(ResourceKind::DashboardStats),
            |remote: Arc<R>| async move { remote.get_dashboard_stats().await },
        )
        .await
    }

    /// Service health. Available without a session.
    pub async fn health(&self) -> QueryState<HealthStatus> {
        self.read(
            CacheKey::collection(ResourceKind::Health),
            |remote: Arc<R>| async move { remote.get_health().await },
        )
        .await
    }
}
