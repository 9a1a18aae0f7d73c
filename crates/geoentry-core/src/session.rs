// ── Auth session & durable storage ──
//
// The signed-in user and bearer token, plus the key-value storage that
// keeps them across restarts. Storage is read once at startup, written on
// login and cleared on logout.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use geoentry_api::User;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

const SESSION_FORMAT_VERSION: u32 = 1;
const SESSION_FILE_NAME: &str = "session.json";

/// The signed-in user and the credential for their requests.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: SecretString,
    pub issued_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(user: User, token: SecretString) -> Self {
        Self {
            user,
            token,
            issued_at: Utc::now(),
        }
    }

    /// Serialized form for [`SessionStore::write`].
    pub fn encode(&self) -> Result<String, CoreError> {
        let stored = StoredSession {
            version: SESSION_FORMAT_VERSION,
            user: self.user.clone(),
            token: self.token.expose_secret().to_owned(),
            issued_at: self.issued_at,
        };
        serde_json::to_string_pretty(&stored).map_err(|e| CoreError::Storage {
            message: format!("failed to encode session: {e}"),
        })
    }

    /// Parse a stored session, rejecting anything that could not have
    /// come from [`encode`](Self::encode).
    pub fn decode(raw: &str) -> Result<Self, CoreError> {
        let stored: StoredSession = serde_json::from_str(raw).map_err(|e| CoreError::Storage {
            message: format!("unreadable session: {e}"),
        })?;

        if stored.version != SESSION_FORMAT_VERSION {
            return Err(CoreError::Storage {
                message: format!("unsupported session version {}", stored.version),
            });
        }
        if stored.token.trim().is_empty() {
            return Err(CoreError::Storage {
                message: "stored session has no token".into(),
            });
        }
        if stored.user.email.trim().is_empty() {
            return Err(CoreError::Storage {
                message: "stored session has no user".into(),
            });
        }

        Ok(Self {
            user: stored.user,
            token: SecretString::from(stored.token),
            issued_at: stored.issued_at,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    version: u32,
    user: User,
    token: String,
    issued_at: DateTime<Utc>,
}

// ── Storage ──────────────────────────────────────────────────────────

/// Durable key-value slot for the serialized session.
pub trait SessionStore: Send + Sync + 'static {
    fn read(&self) -> Result<Option<String>, CoreError>;
    fn write(&self, contents: &str) -> Result<(), CoreError>;
    /// Removing an absent session is not an error.
    fn remove(&self) -> Result<(), CoreError>;
}

impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    fn read(&self) -> Result<Option<String>, CoreError> {
        (**self).read()
    }

    fn write(&self, contents: &str) -> Result<(), CoreError> {
        (**self).write(contents)
    }

    fn remove(&self) -> Result<(), CoreError> {
        (**self).remove()
    }
}

/// Session file on disk, readable by the owner only.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `session.json` in the platform data directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "geoentry", "geoentry")
            .map(|dirs| dirs.data_dir().join(SESSION_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_err(&self, action: &str, err: &std::io::Error) -> CoreError {
        CoreError::Storage {
            message: format!("failed to {action} {}: {err}", self.path.display()),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> Result<Option<String>, CoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.storage_err("read", &e)),
        }
    }

    fn write(&self, contents: &str) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.storage_err("create", &e))?;
        }
        std::fs::write(&self.path, contents).map_err(|e| self.storage_err("write", &e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| self.storage_err("protect", &e))?;
        }

        debug!(path = %self.path.display(), "session persisted");
        Ok(())
    }

    fn remove(&self) -> Result<(), CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_err("remove", &e)),
        }
    }
}

/// Process-local storage, for tests and ephemeral use.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(contents.into())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self) -> Result<Option<String>, CoreError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, contents: &str) -> Result<(), CoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents.to_owned());
        Ok(())
    }

    fn remove(&self) -> Result<(), CoreError> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}
