//! Bookmark store client for linkstash.
//!
//! This crate provides:
//! - The [`Bookmark`] record type
//! - Local validation of new bookmarks before any network effect
//! - [`BookmarkStore`], the seam the view controller is written against
//! - [`SupabaseBookmarks`], the REST implementation scoped to one session

mod bookmark;
mod client;
mod error;

pub use bookmark::{validate_new, Bookmark};
pub use client::{BookmarkStore, SupabaseBookmarks};
pub use error::{StoreError, StoreResult};
