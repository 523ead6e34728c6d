//! Session token persistence.

use crate::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted OAuth session tokens and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredSession {
    /// Supabase user ID.
    pub user_id: String,
    /// User email, if the provider reported one.
    pub email: Option<String>,
    /// Current JWT access token.
    pub access_token: String,
    /// Refresh token for renewing the access token.
    pub refresh_token: String,
    /// Access token expiry time.
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    /// Whether the access token has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Trait for session token storage backends.
pub trait SessionStorage: Send + Sync {
    /// Persist a session, replacing any existing one.
    fn save(&self, session: &StoredSession) -> AuthResult<()>;

    /// Load the persisted session, if any.
    fn load(&self) -> AuthResult<Option<StoredSession>>;

    /// Remove the persisted session. Returns whether one existed.
    fn clear(&self) -> AuthResult<bool>;
}

/// Session storage backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    /// Create a storage backed by the given file path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SessionStorage for FileSessionStorage {
    fn save(&self, session: &StoredSession) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn load(&self) -> AuthResult<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let session: StoredSession = serde_json::from_str(&content)
            .map_err(|e| AuthError::Storage(format!("corrupt session file: {}", e)))?;
        Ok(Some(session))
    }

    fn clear(&self) -> AuthResult<bool> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
