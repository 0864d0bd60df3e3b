//! Loader error type

use std::path::PathBuf;
use thiserror::Error;
use yamdb_common::errors::AppError;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed row in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid value in {file} row {row}: {message}")]
    InvalidRow {
        file: String,
        row: usize,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    App(#[from] AppError),
}
