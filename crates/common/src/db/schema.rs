//! Table and index creation from the entity definitions
//!
//! Every statement is `IF NOT EXISTS`, so running this against an existing
//! database is a no-op.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{sea_query::Index, ConnectionTrait, DbBackend, EntityTrait, Schema};
use tracing::{debug, info};

/// Tables in referential order
pub const TABLES: &[&str] = &[
    "users",
    "categories",
    "genres",
    "titles",
    "genre_title",
    "reviews",
    "comments",
];

/// Create all tables and indexes
pub async fn create_schema<C: ConnectionTrait>(conn: &C) -> Result<()> {
    let schema = Schema::new(conn.get_database_backend());

    create_table(conn, &schema, UserEntity).await?;
    create_table(conn, &schema, CategoryEntity).await?;
    create_table(conn, &schema, GenreEntity).await?;
    create_table(conn, &schema, TitleEntity).await?;
    create_table(conn, &schema, GenreTitleEntity).await?;
    create_table(conn, &schema, ReviewEntity).await?;
    create_table(conn, &schema, CommentEntity).await?;

    create_indexes(conn, &schema, ReviewEntity).await?;
    create_indexes(conn, &schema, CommentEntity).await?;

    // Authoritative guard for one review per user per title
    let unique_review = Index::create()
        .name("ux_reviews_title_author")
        .table(ReviewEntity)
        .col(ReviewColumn::TitleId)
        .col(ReviewColumn::AuthorId)
        .unique()
        .if_not_exists()
        .to_owned();
    conn.execute(conn.get_database_backend().build(&unique_review))
        .await?;

    info!("Database schema ready");
    Ok(())
}

/// Move Postgres id sequences past rows inserted with explicit ids
pub async fn reset_sequences<C: ConnectionTrait>(conn: &C) -> Result<()> {
    if conn.get_database_backend() != DbBackend::Postgres {
        return Ok(());
    }

    for table in TABLES {
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{t}', 'id'), COALESCE((SELECT MAX(id) FROM {t}), 0) + 1, false)",
            t = table
        );
        conn.execute_unprepared(&sql).await?;
        debug!(table = %table, "Sequence reset");
    }

    Ok(())
}

async fn create_table<C, E>(conn: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    conn.execute(conn.get_database_backend().build(&stmt)).await?;
    Ok(())
}

async fn create_indexes<C, E>(conn: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    for mut stmt in schema.create_index_from_entity(entity) {
        stmt.if_not_exists();
        conn.execute(conn.get_database_backend().build(&stmt)).await?;
    }
    Ok(())
}
