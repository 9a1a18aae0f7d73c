// ── Core error types ──
//
// User-facing errors from geoentry-core. Consumers never see raw HTTP
// failures: the `From<geoentry_api::Error>` impl folds transport-layer
// errors into the taxonomy below. Values are `Clone` because a single
// fetch outcome is fanned out to every waiter attached to it.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Remote failures ──────────────────────────────────────────────
    #[error("Network failure: {message}")]
    NetworkFailure { message: String, status: Option<u16> },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Validation failed: {message}")]
    ValidationFailure {
        message: String,
        field: Option<String>,
    },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    // ── Session ──────────────────────────────────────────────────────
    #[error("Not signed in")]
    AuthRequired,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Local failures ───────────────────────────────────────────────
    #[error("Request cancelled")]
    Cancelled,

    #[error("Session storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Transient failures that a query may retry under its policy.
    ///
    /// Mutations never consult this; they fail fast.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkFailure { status, .. } => {
                status.is_none_or(|s| s >= 500 || s == 429)
            }
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Network-class failures (unreachable, non-success response, timeout).
    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkFailure { .. } | Self::Timeout { .. })
    }

    /// Returns `true` when signing in again could resolve the failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthRequired | Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<geoentry_api::Error> for CoreError {
    fn from(err: geoentry_api::Error) -> Self {
        use geoentry_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- sign in again".into(),
            },
            // Timeouts with a known duration arrive as `ApiError::Timeout`.
            ApiError::Transport(ref e) => CoreError::NetworkFailure {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            ApiError::Tls(message) => CoreError::NetworkFailure {
                message: format!("TLS error: {message}"),
                status: None,
            },
            ApiError::Api {
                status, message, ..
            } => CoreError::NetworkFailure {
                message,
                status: Some(status),
            },
            ApiError::Validation { message, field } => {
                CoreError::ValidationFailure { message, field }
            }
            ApiError::NotFound { resource, id } => CoreError::NotFound {
                kind: resource.into(),
                id,
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
