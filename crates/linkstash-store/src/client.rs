//! REST client for the bookmarks table.

use crate::bookmark::{validate_new, Bookmark};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use tracing::debug;

/// Store operations the view controller is written against.
///
/// All operations are implicitly scoped to the session the implementation
/// was constructed with.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Fetch the user's bookmarks, newest first (ties broken by id).
    ///
    /// An empty result set is `Ok(vec![])`, not an error.
    async fn list(&self) -> StoreResult<Vec<Bookmark>>;

    /// Validate and insert a new bookmark, returning the stored row.
    async fn insert(&self, title: &str, url: &str) -> StoreResult<Bookmark>;

    /// Delete a bookmark by id. Ownership is enforced by the backend.
    async fn delete(&self, id: &str) -> StoreResult<()>;
}

/// Bookmark store backed by a Supabase-style REST API, scoped to one session.
#[derive(Clone)]
pub struct SupabaseBookmarks {
    http: reqwest::Client,
    api_url: String,
    anon_key: String,
    user_id: String,
    access_token: String,
}

impl SupabaseBookmarks {
    /// Create a store client scoped to the given session.
    ///
    /// # Arguments
    /// * `api_url` - The Supabase project API URL (e.g., `https://xyz.supabase.co`)
    /// * `anon_key` - The Supabase anon API key
    /// * `user_id` - The authenticated user's ID; all operations are scoped to it
    /// * `access_token` - The session's access token
    pub fn new(
        api_url: impl Into<String>,
        anon_key: impl Into<String>,
        user_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            anon_key: anon_key.into(),
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Build the REST API URL for the bookmarks table.
    fn rest_url(&self) -> String {
        format!("{}/rest/v1/bookmarks", self.api_url)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.access_token))
    }

    /// Turn a non-success response into a `StoreError::Api` carrying the
    /// backend's message.
    async fn api_error(response: reqwest::Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| format!("{} {}", status, body.trim()));
        StoreError::Api(message)
    }
}

#[async_trait]
impl BookmarkStore for SupabaseBookmarks {
    async fn list(&self) -> StoreResult<Vec<Bookmark>> {
        let url = format!(
            "{}?owner=eq.{}&select=id,title,url,owner,created_at&order=created_at.desc,id.desc",
            self.rest_url(),
            self.user_id
        );

        debug!(user_id = %self.user_id, "Fetching bookmarks");

        let response = self
            .authed(self.http.get(&url))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let bookmarks: Vec<Bookmark> = response.json().await?;
        debug!(count = bookmarks.len(), "Fetched bookmarks");
        Ok(bookmarks)
    }

    async fn insert(&self, title: &str, url: &str) -> StoreResult<Bookmark> {
        let (title, url) = validate_new(title, url)?;

        let body = serde_json::json!({
            "title": title,
            "url": url,
            "owner": self.user_id,
        });

        debug!(title = %title, "Inserting bookmark");

        let response = self
            .authed(self.http.post(self.rest_url()))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        // PostgREST returns the inserted rows as an array
        let mut rows: Vec<Bookmark> = response.json().await?;
        rows.pop()
            .ok_or_else(|| StoreError::Api("Insert returned no row".to_string()))
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let url = format!("{}?id=eq.{}", self.rest_url(), id);

        debug!(id = %id, "Deleting bookmark");

        let response = self.authed(self.http.delete(&url)).send().await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }
}
