//! CSV parsing and insertion
//!
//! Every file is parsed before anything is written, then all rows go in
//! inside one transaction in referential order.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseConnection, EntityTrait, TransactionTrait,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;
use yamdb_common::db::{models::*, schema};

use crate::errors::LoaderError;

/// Fixture files in the order they are inserted
pub const DATA_FILES: [&str; 7] = [
    "users.csv",
    "category.csv",
    "genre.csv",
    "titles.csv",
    "genre_title.csv",
    "review.csv",
    "comments.csv",
];

#[derive(Debug, Deserialize)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    role: String,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct SlugRow {
    id: i32,
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct TitleRow {
    id: i32,
    name: String,
    year: i32,
    #[serde(default)]
    description: Option<String>,
    category: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct GenreTitleRow {
    id: i32,
    title_id: i32,
    genre_id: i32,
}

#[derive(Debug, Deserialize)]
struct ReviewRow {
    id: i32,
    title_id: i32,
    text: String,
    author: i32,
    score: i32,
    pub_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    id: i32,
    review_id: i32,
    text: String,
    author: i32,
    pub_date: DateTime<Utc>,
}

/// Rows inserted per file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub categories: usize,
    pub genres: usize,
    pub titles: usize,
    pub genre_titles: usize,
    pub reviews: usize,
    pub comments: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.users
            + self.categories
            + self.genres
            + self.titles
            + self.genre_titles
            + self.reviews
            + self.comments
    }
}

struct Dataset {
    users: Vec<UserRow>,
    categories: Vec<SlugRow>,
    genres: Vec<SlugRow>,
    titles: Vec<TitleRow>,
    genre_titles: Vec<GenreTitleRow>,
    reviews: Vec<ReviewRow>,
    comments: Vec<CommentRow>,
}

/// Imports a fixture directory
pub struct Importer {
    data_dir: PathBuf,
}

impl Importer {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Create the schema if needed and import every file
    pub async fn run(&self, conn: &DatabaseConnection) -> Result<ImportSummary, LoaderError> {
        let data = self.read_all().await?;

        schema::create_schema(conn).await?;

        let txn = conn.begin().await?;
        let summary = insert_all(&txn, data).await?;
        schema::reset_sequences(&txn).await?;
        txn.commit().await?;

        info!(rows = summary.total(), dir = %self.data_dir.display(), "Import complete");
        Ok(summary)
    }

    async fn read_all(&self) -> Result<Dataset, LoaderError> {
        let [users, category, genre, titles, genre_title, review, comments] = DATA_FILES;
        Ok(Dataset {
            users: self.read_rows(users).await?,
            categories: self.read_rows(category).await?,
            genres: self.read_rows(genre).await?,
            titles: self.read_rows(titles).await?,
            genre_titles: self.read_rows(genre_title).await?,
            reviews: self.read_rows(review).await?,
            comments: self.read_rows(comments).await?,
        })
    }

    async fn read_rows<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, LoaderError> {
        let path = self.data_dir.join(file);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| LoaderError::Io {
                path: path.clone(),
                source,
            })?;

        csv::Reader::from_reader(bytes.as_slice())
            .deserialize()
            .map(|row| {
                row.map_err(|source| LoaderError::Csv {
                    file: file.to_string(),
                    source,
                })
            })
            .collect()
    }
}

async fn insert_all<C: ConnectionTrait>(conn: &C, data: Dataset) -> Result<ImportSummary, LoaderError> {
    let mut summary = ImportSummary::default();
    let now = Utc::now();

    for (index, row) in data.users.into_iter().enumerate() {
        let role = Role::from_str(&row.role).map_err(|message| LoaderError::InvalidRow {
            file: "users.csv".to_string(),
            row: index + 1,
            message,
        })?;
        let user = UserActiveModel {
            id: Set(row.id),
            username: Set(row.username),
            email: Set(row.email),
            role: Set(role),
            bio: Set(row.bio.filter(|b| !b.is_empty())),
            first_name: Set(row.first_name),
            last_name: Set(row.last_name),
            is_staff: Set(false),
            auth_state: Set(AuthState::Pending),
            last_login: Set(None),
            date_joined: Set(now),
        };
        UserEntity::insert(user).exec_without_returning(conn).await?;
        summary.users += 1;
    }
    info!(rows = summary.users, "Loaded users");

    for row in data.categories {
        let category = CategoryActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            slug: Set(row.slug),
        };
        CategoryEntity::insert(category).exec_without_returning(conn).await?;
        summary.categories += 1;
    }
    info!(rows = summary.categories, "Loaded categories");

    for row in data.genres {
        let genre = GenreActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            slug: Set(row.slug),
        };
        GenreEntity::insert(genre).exec_without_returning(conn).await?;
        summary.genres += 1;
    }
    info!(rows = summary.genres, "Loaded genres");

    for row in data.titles {
        let title = TitleActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            year: Set(row.year),
            description: Set(row.description.filter(|d| !d.is_empty())),
            category_id: Set(row.category),
        };
        TitleEntity::insert(title).exec_without_returning(conn).await?;
        summary.titles += 1;
    }
    info!(rows = summary.titles, "Loaded titles");

    for row in data.genre_titles {
        let link = GenreTitleActiveModel {
            id: Set(row.id),
            genre_id: Set(row.genre_id),
            title_id: Set(row.title_id),
        };
        GenreTitleEntity::insert(link).exec_without_returning(conn).await?;
        summary.genre_titles += 1;
    }
    info!(rows = summary.genre_titles, "Loaded genre links");

    for (index, row) in data.reviews.into_iter().enumerate() {
        if !(1..=10).contains(&row.score) {
            return Err(LoaderError::InvalidRow {
                file: "review.csv".to_string(),
                row: index + 1,
                message: format!("score {} outside 1..=10", row.score),
            });
        }
        let review = ReviewActiveModel {
            id: Set(row.id),
            text: Set(row.text),
            score: Set(row.score),
            author_id: Set(row.author),
            title_id: Set(row.title_id),
            pub_date: Set(row.pub_date),
        };
        ReviewEntity::insert(review).exec_without_returning(conn).await?;
        summary.reviews += 1;
    }
    info!(rows = summary.reviews, "Loaded reviews");

    for row in data.comments {
        let comment = CommentActiveModel {
            id: Set(row.id),
            text: Set(row.text),
            author_id: Set(row.author),
            review_id: Set(row.review_id),
            pub_date: Set(row.pub_date),
        };
        CommentEntity::insert(comment).exec_without_returning(conn).await?;
        summary.comments += 1;
    }
    info!(rows = summary.comments, "Loaded comments");

    Ok(summary)
}
