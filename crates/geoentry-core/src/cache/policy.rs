// ── Staleness & retry policy ──
//
// One `StalenessPolicy` per resource kind. The per-kind values differ
// (devices refetch on focus, locations do not; retry counts vary) and are
// kept as plain data rather than derived from a shared rule.

use std::time::Duration;

use crate::cache::key::ResourceKind;
use crate::error::CoreError;

const MAX_RETRY_COUNT: u32 = 10;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// What can cause a background refetch besides an explicit read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchTrigger {
    WindowFocus,
    Reconnect,
}

/// Freshness and retry behavior for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct StalenessPolicy {
    /// How long fetched data stays fresh.
    pub stale_duration: Duration,
    pub refetch_on_focus: bool,
    pub refetch_on_reconnect: bool,
    /// When `false`, a read serves stale-by-time data without fetching.
    /// Invalidated entries are refetched regardless.
    pub refetch_on_mount: bool,
    /// Extra attempts after a transient failure.
    pub retry_count: u32,
}

impl StalenessPolicy {
    pub const DEVICES: Self = Self {
        stale_duration: Duration::from_secs(5 * 60),
        refetch_on_focus: true,
        refetch_on_reconnect: true,
        refetch_on_mount: true,
        retry_count: 3,
    };

    pub const LOCATIONS: Self = Self {
        stale_duration: Duration::from_secs(15 * 60),
        refetch_on_focus: false,
        refetch_on_reconnect: true,
        refetch_on_mount: true,
        retry_count: 2,
    };

    pub const PROXIMITY_EVENTS: Self = Self {
        stale_duration: Duration::from_secs(30),
        refetch_on_focus: false,
        refetch_on_reconnect: true,
        refetch_on_mount: true,
        retry_count: 1,
    };

    pub const DASHBOARD_STATS: Self = Self {
        stale_duration: Duration::from_secs(60),
        refetch_on_focus: false,
        refetch_on_reconnect: true,
        refetch_on_mount: true,
        retry_count: 1,
    };

    pub const HEALTH: Self = Self {
        stale_duration: Duration::from_secs(30),
        refetch_on_focus: false,
        refetch_on_reconnect: false,
        refetch_on_mount: true,
        retry_count: 0,
    };

    /// Product defaults for `kind`.
    pub const fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Devices => Self::DEVICES,
            ResourceKind::Locations => Self::LOCATIONS,
            ResourceKind::ProximityEvents => Self::PROXIMITY_EVENTS,
            ResourceKind::DashboardStats => Self::DASHBOARD_STATS,
            ResourceKind::Health => Self::HEALTH,
        }
    }

    pub fn with_stale_duration(mut self, stale_duration: Duration) -> Self {
        self.stale_duration = stale_duration;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Data fetched `elapsed` ago is stale once the window has fully passed.
    pub fn is_stale_after(&self, elapsed: Duration) -> bool {
        elapsed >= self.stale_duration
    }

    pub fn refetches_on(&self, trigger: RefetchTrigger) -> bool {
        match trigger {
            RefetchTrigger::WindowFocus => self.refetch_on_focus,
            RefetchTrigger::Reconnect => self.refetch_on_reconnect,
        }
    }

    /// Backoff before retry number `attempt` (0-based): 1s, 2s, 4s, ... capped at 30s.
    pub fn retry_delay(attempt: u32) -> Duration {
        RETRY_BASE_DELAY
            .checked_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
            .map_or(RETRY_MAX_DELAY, |d| d.min(RETRY_MAX_DELAY))
    }

    fn validate(&self, kind: ResourceKind) -> Result<(), CoreError> {
        let needs_window = matches!(
            kind,
            ResourceKind::Devices | ResourceKind::Locations | ResourceKind::ProximityEvents
        );
        if needs_window && self.stale_duration.is_zero() {
            return Err(CoreError::Config {
                message: format!("{kind}: stale duration must be greater than zero"),
            });
        }
        if self.retry_count > MAX_RETRY_COUNT {
            return Err(CoreError::Config {
                message: format!(
                    "{kind}: retry count {} exceeds the maximum of {MAX_RETRY_COUNT}",
                    self.retry_count
                ),
            });
        }
        Ok(())
    }
}

/// The full per-kind policy table, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicies {
    devices: StalenessPolicy,
    locations: StalenessPolicy,
    proximity_events: StalenessPolicy,
    dashboard_stats: StalenessPolicy,
    health: StalenessPolicy,
}

impl CachePolicies {
    pub fn new(
        devices: StalenessPolicy,
        locations: StalenessPolicy,
        proximity_events: StalenessPolicy,
        dashboard_stats: StalenessPolicy,
        health: StalenessPolicy,
    ) -> Result<Self, CoreError> {
        let policies = Self {
            devices,
            locations,
            proximity_events,
            dashboard_stats,
            health,
        };
        policies.validate()?;
        Ok(policies)
    }

    /// Replace the policy for one kind, re-validating the table.
    pub fn with(mut self, kind: ResourceKind, policy: StalenessPolicy) -> Result<Self, CoreError> {
        *self.slot_mut(kind) = policy;
        self.validate()?;
        Ok(self)
    }

    pub fn get(&self, kind: ResourceKind) -> &StalenessPolicy {
        match kind {
            ResourceKind::Devices => &self.devices,
            ResourceKind::Locations => &self.locations,
            ResourceKind::ProximityEvents => &self.proximity_events,
            ResourceKind::DashboardStats => &self.dashboard_stats,
            ResourceKind::Health => &self.health,
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut StalenessPolicy {
        match kind {
            ResourceKind::Devices => &mut self.devices,
            ResourceKind::Locations => &mut self.locations,
            ResourceKind::ProximityEvents => &mut self.proximity_events,
            ResourceKind::DashboardStats => &mut self.dashboard_stats,
            ResourceKind::Health => &mut self.health,
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        for (kind, policy) in [
            (ResourceKind::Devices, &self.devices),
            (ResourceKind::Locations, &self.locations),
            (ResourceKind::ProximityEvents, &self.proximity_events),
            (ResourceKind::DashboardStats, &self.dashboard_stats),
            (ResourceKind::Health, &self.health),
        ] {
            policy.validate(kind)?;
        }

        // devices window <= locations window
        if self.devices.stale_duration > self.locations.stale_duration {
            return Err(CoreError::Config {
                message: format!(
                    "devices stale duration ({}s) must not exceed locations stale duration ({}s)",
                    self.devices.stale_duration.as_secs(),
                    self.locations.stale_duration.as_secs()
                ),
            });
        }
        Ok(())
    }
}

impl Default for CachePolicies {
    fn default() -> Self {
        Self {
            devices: StalenessPolicy::DEVICES,
            locations: StalenessPolicy::LOCATIONS,
            proximity_events: StalenessPolicy::PROXIMITY_EVENTS,
            dashboard_stats: StalenessPolicy::DASHBOARD_STATS,
            health: StalenessPolicy::HEALTH,
        }
    }
}
