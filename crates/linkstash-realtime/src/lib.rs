//! Realtime subscription manager for linkstash.
//!
//! This crate provides:
//! - A WebSocket channel to the backend's realtime endpoint
//! - Server-side filtering to one user's bookmark rows
//! - The Unsubscribed → Subscribing → Subscribed (→ Closed) state machine
//! - Payload-free change notices for the view controller to react to
//!
//! A dropped socket closes the channel; there is no automatic reconnection.
//! The consumer observes the `Closed` state and decides what to do.

mod channel;
mod error;
mod messages;

pub use channel::{BookmarkChannel, ChangeNotice, ChannelState, RealtimeConfig};
pub use error::{RealtimeError, RealtimeResult};
pub use messages::Frame;
