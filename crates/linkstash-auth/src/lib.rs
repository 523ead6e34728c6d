//! Session guard for linkstash.
//!
//! This crate provides:
//! - OAuth sign-in via a local HTTP callback server
//! - Session validation against the identity layer
//! - Token persistence through a storage trait seam
//! - Sign-out with server-side revocation

mod error;
mod oauth;
mod session;
mod storage;

pub use error::{AuthError, AuthResult};
pub use oauth::{CallbackResult, CallbackServer, DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT_SECS};
pub use session::{Session, SessionManager};
pub use storage::{FileSessionStorage, SessionStorage, StoredSession};
