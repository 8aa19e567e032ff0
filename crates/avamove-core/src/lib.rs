//! Avamove Core Library
//!
//! This crate provides the domain models, error types, and configuration
//! shared across all avatar migration components.

pub mod config;
pub mod error;
pub mod models;
pub mod prefix;

// Re-export commonly used types
pub use config::{MigrationConfig, DEFAULT_MAX_CONCURRENCY};
pub use error::MigrateError;
pub use models::{AvatarRecord, Location, MigrationOutcome};
pub use prefix::PrefixMap;
