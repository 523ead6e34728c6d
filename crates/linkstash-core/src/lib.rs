//! Shared configuration and utilities for linkstash.
//!
//! This crate provides:
//! - Configuration loading with compile-time backend defaults
//! - File system path management
//! - Logging initialization
//! - Core error types

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_LOG_LEVEL, DEFAULT_SUPABASE_ANON_KEY, DEFAULT_SUPABASE_URL};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
