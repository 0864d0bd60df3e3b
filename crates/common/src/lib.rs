//! YaMDb Common Library
//!
//! Shared code for the YaMDb gateway and loader including:
//! - Database models, schema and repository
//! - Error types and handling
//! - Configuration management
//! - Authentication, confirmation codes and permission policies
//! - Outgoing mail
//! - Pagination and field validation
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod mail;
pub mod metrics;
pub mod observability;
pub mod pagination;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
