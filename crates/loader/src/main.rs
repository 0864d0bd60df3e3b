//! YaMDb Bulk Loader
//!
//! Imports the fixture CSV files into the configured database:
//! 1. Parses every file
//! 2. Creates the schema if missing
//! 3. Inserts all rows in one transaction
//!
//! The data directory is the first argument, else `DATA_DIR`, else
//! `static/data`.

use anyhow::Context;
use tracing::info;
use yamdb_common::{config::AppConfig, db::DbPool, observability, VERSION};
use yamdb_loader::{Importer, DEFAULT_DATA_DIR};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    observability::init_tracing(&config.observability);

    info!("Starting YaMDb Loader v{}", VERSION);

    let data_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DATA_DIR").ok())
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

    let db = DbPool::new(&config.database).await?;
    let importer = Importer::new(data_dir);

    let summary = importer
        .run(db.write())
        .await
        .with_context(|| format!("Import from {} failed", importer.data_dir().display()))?;

    println!(
        "Imported {} rows: {} users, {} categories, {} genres, {} titles, {} genre links, {} reviews, {} comments",
        summary.total(),
        summary.users,
        summary.categories,
        summary.genres,
        summary.titles,
        summary.genre_titles,
        summary.reviews,
        summary.comments,
    );

    Ok(())
}
