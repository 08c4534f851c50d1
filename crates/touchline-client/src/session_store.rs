//! On-disk persistence of the local pseudo-identity.
//!
//! The identity lives in a small JSON file (by default
//! `<config dir>/touchline/session.json`). Missing fields are generated and
//! written back, so the user id survives restarts and a chosen display name
//! sticks.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touchline_core::{Environment, UserSession};

/// Session store errors.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// No platform config directory and no explicit path.
    #[error("no configuration directory available")]
    NoConfigDir,

    /// Reading or writing the session file failed.
    #[error("session file {path}: {source}")]
    Io {
        /// Session file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Session could not be serialized.
    #[error("cannot serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persisted form; every field optional so partial files still load.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

/// JSON file holding the local identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform default location.
    pub fn default_location() -> Result<Self, SessionStoreError> {
        let dir = dirs::config_dir().ok_or(SessionStoreError::NoConfigDir)?;
        Ok(Self::new(dir.join("touchline").join("session.json")))
    }

    /// Session file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored identity, generating and persisting missing fields.
    ///
    /// An unreadable or corrupt file is replaced by a fresh identity.
    pub fn load_or_create<E: Environment>(&self, env: &E) -> Result<UserSession, SessionStoreError> {
        let stored = self.read();

        let complete = stored.user_id.is_some() && stored.username.is_some();
        let session = UserSession {
            user_id: stored.user_id.unwrap_or_else(|| UserSession::generate_user_id(env)),
            username: stored.username.unwrap_or_else(|| UserSession::generate_username(env)),
        };

        if !complete {
            tracing::info!(path = %self.path.display(), user_id = %session.user_id, "created session");
            self.save(&session)?;
        }
        Ok(session)
    }

    /// Persist a new display name for `session`.
    pub fn set_username(
        &self,
        session: &UserSession,
        username: &str,
    ) -> Result<UserSession, SessionStoreError> {
        let updated = session.clone().with_username(username);
        self.save(&updated)?;
        Ok(updated)
    }

    /// Write `session` to disk, creating parent directories.
    pub fn save(&self, session: &UserSession) -> Result<(), SessionStoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;
        }
        let body = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, body).map_err(|source| self.io_error(source))
    }

    fn read(&self) -> StoredSession {
        let body = match fs::read_to_string(&self.path) {
            Ok(body) => body,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return StoredSession::default(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "cannot read session file");
                return StoredSession::default();
            },
        };

        serde_json::from_str(&body).unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "corrupt session file");
            StoredSession::default()
        })
    }

    fn io_error(&self, source: io::Error) -> SessionStoreError {
        SessionStoreError::Io { path: self.path.clone(), source }
    }
}
