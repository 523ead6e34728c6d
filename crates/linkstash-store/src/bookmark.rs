//! Bookmark record type and input validation.

use crate::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One saved link, as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookmark {
    /// Backend-assigned unique identifier, immutable.
    pub id: String,
    /// User-supplied display string.
    pub title: String,
    /// Absolute URL.
    pub url: String,
    /// Identifier of the user who created it. Never user-editable.
    pub owner: String,
    /// Backend-assigned creation timestamp. Sole sort key (descending).
    pub created_at: DateTime<Utc>,
}

/// Validate a new bookmark's fields before any network effect.
///
/// Returns the trimmed `(title, url)` pair on success. The title must be
/// non-empty after trimming; the url must be non-empty after trimming and
/// parse as an absolute URL.
pub fn validate_new(title: &str, url: &str) -> StoreResult<(String, String)> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::Validation("Title must not be empty".to_string()));
    }

    let url = url.trim();
    if url.is_empty() {
        return Err(StoreError::Validation("URL must not be empty".to_string()));
    }
    if url::Url::parse(url).is_err() {
        return Err(StoreError::Validation(format!("Not a valid URL: {}", url)));
    }

    Ok((title.to_string(), url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_input_and_trims() {
        let (title, url) = validate_new("  GitHub  ", " https://github.com ").unwrap();
        assert_eq!(title, "GitHub");
        assert_eq!(url, "https://github.com");
    }

    #[test]
    fn rejects_empty_title() {
        assert!(matches!(
            validate_new("", "https://example.com"),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn rejects_whitespace_only_title() {
        assert!(matches!(
            validate_new("   ", "https://example.com"),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_url() {
        assert!(matches!(
            validate_new("GitHub", "  "),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn rejects_non_absolute_url() {
        assert!(matches!(
            validate_new("GitHub", "not a url"),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            validate_new("GitHub", "/relative/path"),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn bookmark_deserializes_backend_row() {
        let row = r#"{
            "id": "b1",
            "title": "GitHub",
            "url": "https://github.com",
            "owner": "u1",
            "created_at": "2026-08-01T12:00:00+00:00"
        }"#;
        let bookmark: Bookmark = serde_json::from_str(row).unwrap();
        assert_eq!(bookmark.id, "b1");
        assert_eq!(bookmark.owner, "u1");
    }
}
