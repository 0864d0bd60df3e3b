//! Request middleware and per-request extractors

pub mod auth;
pub mod metrics;
pub mod rate_limit;
