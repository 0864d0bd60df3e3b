//! YaMDb bulk loader
//!
//! Imports the CSV fixtures (users, categories, genres, titles, genre links,
//! reviews, comments) into an empty database, keeping their ids.

pub mod errors;
pub mod importer;

pub use errors::LoaderError;
pub use importer::{ImportSummary, Importer, DATA_FILES};

/// Where the fixtures live unless told otherwise
pub const DEFAULT_DATA_DIR: &str = "static/data";
