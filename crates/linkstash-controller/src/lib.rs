//! View state controller for linkstash.
//!
//! Owns the in-memory bookmark list and the transient UI flags, reconciles
//! them against refreshes and local mutations, and notifies registered
//! listeners on every state change. The rendering layer reads snapshots and
//! redraws on notification; it never mutates state directly.

mod controller;

pub use controller::{DashboardController, DashboardState, DEFAULT_SUCCESS_WINDOW};
