// ── Cache keys ──
//
// A key addresses one cache entry: resource kind, optional id, optional
// sub-scope segments, and the user the data belongs to. The owner is not
// part of the rendered path; it only ties the entry to a user for
// per-user invalidation.

use std::fmt;

use geoentry_api::ResourceId;
use strum::{Display, EnumIter, EnumString};

/// Every kind of data the dashboard caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum ResourceKind {
    Devices,
    Locations,
    ProximityEvents,
    DashboardStats,
    Health,
}

impl ResourceKind {
    /// Protected kinds may only be queried with a signed-in session.
    pub fn is_protected(self) -> bool {
        !matches!(self, Self::Health)
    }

    /// Singular noun used in notifications and error messages.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Devices => "device",
            Self::Locations => "location",
            Self::ProximityEvents => "proximity event",
            Self::DashboardStats => "dashboard stats",
            Self::Health => "health",
        }
    }
}

/// Identifier of a single cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ResourceKind,
    id: Option<ResourceId>,
    scope: Vec<(&'static str, String)>,
    owner: Option<ResourceId>,
}

impl CacheKey {
    /// Key for the whole collection of a kind (`devices`).
    pub fn collection(kind: ResourceKind) -> Self {
        Self {
            kind,
            id: None,
            scope: Vec::new(),
            owner: None,
        }
    }

    /// Key for a single resource (`devices:42`).
    pub fn item(kind: ResourceKind, id: ResourceId) -> Self {
        Self {
            id: Some(id),
            ..Self::collection(kind)
        }
    }

    /// Append a sub-scope segment (`proximity-events:device:42`).
    pub fn scoped(mut self, name: &'static str, value: impl ToString) -> Self {
        self.scope.push((name, value.to_string()));
        self
    }

    /// Tie the entry to the user whose data it holds.
    pub fn owned_by(mut self, user: ResourceId) -> Self {
        self.owner = Some(user);
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }

    pub fn owner(&self) -> Option<&ResourceId> {
        self.owner.as_ref()
    }

    /// Collection keys carry no id; scoped lists are still collections.
    pub fn is_collection(&self) -> bool {
        self.id.is_none()
    }

    /// Rendered path: `kind[:id][:scope-name:scope-value]*`.
    pub fn path(&self) -> String {
        self.to_string()
    }

    /// Segment-boundary prefix match against the rendered path.
    ///
    /// `proximity-events` matches `proximity-events` and
    /// `proximity-events:device:42`, but not `proximity-events-archive`.
    /// A blank pattern matches nothing.
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        let pattern = pattern.trim().trim_end_matches(':');
        if pattern.is_empty() {
            return false;
        }
        let path = self.path();
        path == pattern
            || path
                .strip_prefix(pattern)
                .is_some_and(|rest| rest.starts_with(':'))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref id) = self.id {
            write!(f, ":{id}")?;
        }
        for (name, value) in &self.scope {
            write!(f, ":{name}:{value}")?;
        }
        Ok(())
    }
}
