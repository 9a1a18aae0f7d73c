// ── Query state ──
//
// What a read hands back to the caller: the last good data (if any), the
// most recent failure (if any), and whether a fetch is still pending.

use std::sync::Arc;

use tokio::time::Instant;

use crate::error::CoreError;

/// Coarse lifecycle of a query, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum QueryStatus {
    /// Disabled, or never fetched.
    Idle,
    Loading,
    Success,
    Error,
}

/// Snapshot of one cached query.
///
/// `data` survives failed refetches: a failure sets `error` and leaves the
/// last good value in place.
#[derive(Debug)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<CoreError>,
    pub is_loading: bool,
    pub is_stale: bool,
    /// When `data` was last written by a successful fetch.
    pub updated_at: Option<Instant>,
    /// `false` when the query was skipped because no session is active.
    pub enabled: bool,
}

impl<T> QueryState<T> {
    /// A query that was not run. Carries no data and touched no cache entry.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::idle()
        }
    }

    pub(crate) fn idle() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            is_stale: false,
            updated_at: None,
            enabled: true,
        }
    }

    pub fn status(&self) -> QueryStatus {
        if self.is_loading {
            QueryStatus::Loading
        } else if self.error.is_some() {
            QueryStatus::Error
        } else if self.data.is_some() {
            QueryStatus::Success
        } else {
            QueryStatus::Idle
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == QueryStatus::Success
    }

    /// Data on success, the error otherwise.
    ///
    /// A disabled query becomes [`CoreError::AuthRequired`].
    pub fn into_result(self) -> Result<Arc<T>, CoreError> {
        if !self.enabled {
            return Err(CoreError::AuthRequired);
        }
        match (self.error, self.data) {
            (Some(err), _) => Err(err),
            (None, Some(data)) => Ok(data),
            (None, None) => Err(CoreError::Internal("query produced no data".into())),
        }
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.is_loading,
            is_stale: self.is_stale,
            updated_at: self.updated_at,
            enabled: self.enabled,
        }
    }
}
