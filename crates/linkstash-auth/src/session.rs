//! Session validation and lifecycle.

use crate::storage::{SessionStorage, StoredSession};
use crate::{AuthError, AuthResult};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// An authenticated identity, validated against the identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Stable identifier of the signed-in principal.
    pub user_id: String,
    /// Display-only email, if known.
    pub email: Option<String>,
    /// Access token for backend calls.
    pub access_token: String,
}

/// Response body of the identity layer's user endpoint.
#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
}

/// Response body of the token refresh endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

/// Manages the current session: validation, refresh, and sign-out.
///
/// The manager holds no session cache. Every [`current_session`](Self::current_session)
/// call asks the identity layer for ground truth, so absence after the check
/// resolves is authoritative.
pub struct SessionManager {
    http: reqwest::Client,
    api_url: String,
    anon_key: String,
    storage: Box<dyn SessionStorage>,
}

impl SessionManager {
    /// Create a new session manager.
    ///
    /// # Arguments
    /// * `api_url` - The Supabase project API URL (e.g., `https://xyz.supabase.co`)
    /// * `anon_key` - The Supabase anon API key
    /// * `storage` - Token persistence backend
    pub fn new(
        api_url: impl Into<String>,
        anon_key: impl Into<String>,
        storage: Box<dyn SessionStorage>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            anon_key: anon_key.into(),
            storage,
        }
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.api_url, endpoint)
    }

    /// Persist a freshly obtained session (after the OAuth round trip).
    pub fn store_session(
        &self,
        access_token: &str,
        refresh_token: &str,
        user_id: &str,
        email: Option<&str>,
        expires_in: i64,
    ) -> AuthResult<()> {
        let stored = StoredSession {
            user_id: user_id.to_string(),
            email: email.map(|e| e.to_string()),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at: Utc::now() + Duration::seconds(expires_in),
        };
        self.storage.save(&stored)?;
        info!(user_id = %user_id, "Session stored");
        Ok(())
    }

    /// Return the current session, or `None` if the caller is not signed in.
    ///
    /// An expired access token is exchanged once via the refresh token before
    /// reporting absence. A token the identity layer rejects clears local
    /// state and reports absence. `None` is a routing decision, not an error.
    pub async fn current_session(&self) -> AuthResult<Option<Session>> {
        let stored = match self.storage.load()? {
            Some(stored) => stored,
            None => return Ok(None),
        };

        let stored = if stored.is_expired() {
            debug!("Access token expired, attempting refresh");
            match self.refresh(&stored).await? {
                Some(renewed) => renewed,
                None => {
                    self.storage.clear()?;
                    return Ok(None);
                }
            }
        } else {
            stored
        };

        match self.validate(&stored.access_token).await? {
            Some(user) => Ok(Some(Session {
                user_id: user.id,
                email: user.email.or(stored.email),
                access_token: stored.access_token,
            })),
            None => {
                debug!("Identity layer rejected token, clearing session");
                self.storage.clear()?;
                Ok(None)
            }
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Returns `Ok(None)` when the identity layer rejects the refresh token.
    async fn refresh(&self, stored: &StoredSession) -> AuthResult<Option<StoredSession>> {
        let url = format!("{}?grant_type=refresh_token", self.auth_url("token"));

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": stored.refresh_token }))
            .send()
            .await?;

        if response.status().is_client_error() {
            warn!(status = %response.status(), "Refresh token rejected");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AuthError::Identity(format!(
                "Token refresh failed: {}",
                response.status()
            )));
        }

        let body: RefreshResponse = response.json().await?;
        let renewed = StoredSession {
            user_id: stored.user_id.clone(),
            email: stored.email.clone(),
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_at: Utc::now() + Duration::seconds(body.expires_in),
        };
        self.storage.save(&renewed)?;
        debug!("Access token refreshed");
        Ok(Some(renewed))
    }

    /// Validate an access token against the identity layer.
    ///
    /// Returns `Ok(None)` when the token is rejected (401/403).
    async fn validate(&self, access_token: &str) -> AuthResult<Option<UserResponse>> {
        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        if response.status().is_client_error() {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AuthError::Identity(format!(
                "User lookup failed: {}",
                response.status()
            )));
        }

        Ok(Some(response.json().await?))
    }

    /// Sign out: revoke the token server-side and clear local state.
    ///
    /// Revocation failure is logged but never blocks local clearing.
    pub async fn sign_out(&self) -> AuthResult<()> {
        if let Some(stored) = self.storage.load()? {
            let result = self
                .http
                .post(self.auth_url("logout"))
                .header("apikey", &self.anon_key)
                .header("Authorization", format!("Bearer {}", stored.access_token))
                .send()
                .await;

            match result {
                Ok(response) if !response.status().is_success() => {
                    warn!(status = %response.status(), "Server-side sign-out failed");
                }
                Err(e) => {
                    warn!(error = %e, "Server-side sign-out failed");
                }
                Ok(_) => {}
            }
        }

        self.storage.clear()?;
        info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthResult;
    use std::sync::Mutex;

    struct MemoryStorage {
        session: Mutex<Option<StoredSession>>,
    }

    impl MemoryStorage {
        fn new() -> Self {
            Self {
                session: Mutex::new(None),
            }
        }
    }

    impl SessionStorage for MemoryStorage {
        fn save(&self, session: &StoredSession) -> AuthResult<()> {
            *self.session.lock().unwrap() = Some(session.clone());
            Ok(())
        }

        fn load(&self) -> AuthResult<Option<StoredSession>> {
            Ok(self.session.lock().unwrap().clone())
        }

        fn clear(&self) -> AuthResult<bool> {
            Ok(self.session.lock().unwrap().take().is_some())
        }
    }

    fn make_manager() -> SessionManager {
        SessionManager::new(
            "http://localhost:54321",
            "test-key",
            Box::new(MemoryStorage::new()),
        )
    }

    #[test]
    fn auth_url_targets_auth_v1() {
        let manager = make_manager();
        assert_eq!(
            manager.auth_url("user"),
            "http://localhost:54321/auth/v1/user"
        );
    }

    #[tokio::test]
    async fn current_session_is_none_without_stored_tokens() {
        let manager = make_manager();
        let session = manager.current_session().await.unwrap();
        assert!(session.is_none());
    }

    #[test]
    fn store_session_persists_tokens() {
        let manager = make_manager();
        manager
            .store_session("access", "refresh", "user-1", Some("a@b.co"), 3600)
            .unwrap();

        let stored = manager.storage.load().unwrap().unwrap();
        assert_eq!(stored.user_id, "user-1");
        assert_eq!(stored.access_token, "access");
        assert_eq!(stored.email.as_deref(), Some("a@b.co"));
        assert!(!stored.is_expired());
    }
}
