// Aggregate endpoints

use crate::client::ApiClient;
use crate::error::Error;
use crate::types::{DashboardStats, HealthStatus};

impl ApiClient {
    /// `GET dashboard/stats`
    pub async fn get_dashboard_stats(&self) -> Result<DashboardStats, Error> {
        self.get("dashboard/stats").await
    }

    /// `GET health` (no authentication required).
    pub async fn get_health(&self) -> Result<HealthStatus, Error> {
        self.get("health").await
    }
}
