//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::pagination::{Page, PageRequest};
use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, Query},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Select, Set, SqlErr, TransactionTrait,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Fields for a new user row
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub bio: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Partial user update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub bio: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.bio.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
    }
}

/// Title list filters
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    /// Genre slug
    pub genre: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    pub year: Option<i32>,
}

/// A title to create; category and genres are given by slug
#[derive(Debug, Clone)]
pub struct NewTitle {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category: Option<String>,
    pub genres: Vec<String>,
}

/// Partial title update; `genres` replaces the whole set when present
#[derive(Debug, Clone, Default)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i32>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    /// `Some(None)` detaches the category
    pub category: Option<Option<String>>,
    pub genres: Option<Vec<String>>,
}

/// A title with its category, genres and computed rating
#[derive(Debug, Clone)]
pub struct TitleDetails {
    pub title: Title,
    pub category: Option<Category>,
    pub genres: Vec<Genre>,
    pub rating: Option<f64>,
}

/// A review or comment together with its author's username
#[derive(Debug, Clone)]
pub struct Authored<T> {
    pub record: T,
    pub author: String,
}

#[derive(Debug, FromQueryResult)]
struct ScoreTotals {
    title_id: i32,
    total: i64,
    reviews: i64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by username
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by username or fail with 404
    pub async fn get_user(&self, username: &str) -> Result<User> {
        self.find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound {
                username: username.to_string(),
            })
    }

    /// List users, optionally filtered by a username substring
    pub async fn list_users(&self, search: Option<&str>, page: PageRequest) -> Result<Page<User>> {
        let mut query = UserEntity::find();
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query = query.filter(icontains((UserEntity, UserColumn::Username), term));
        }
        paginate(self.read_conn(), query.order_by_asc(UserColumn::Id), page).await
    }

    /// Create a user (admin path)
    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let conn = self.write_conn();
        ensure_user_fields_free(conn, None, Some(&new.username), Some(&new.email)).await?;

        let user = UserActiveModel {
            username: Set(new.username),
            email: Set(new.email),
            role: Set(new.role),
            bio: Set(new.bio),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            is_staff: Set(false),
            auth_state: Set(AuthState::Pending),
            last_login: Set(None),
            date_joined: Set(Utc::now()),
            ..Default::default()
        };

        let user = user
            .insert(conn)
            .await
            .map_err(|e| unique_or(e, "username", "A user with that username or email already exists"))?;

        info!(user_id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Apply a partial update to a user
    pub async fn update_user(&self, user: User, changes: UserChanges) -> Result<User> {
        if changes.is_empty() {
            return Ok(user);
        }
        let conn = self.write_conn();
        let username = changes.username.as_deref().filter(|u| *u != user.username);
        let email = changes.email.as_deref().filter(|e| *e != user.email);
        ensure_user_fields_free(conn, Some(user.id), username, email).await?;

        let mut active: UserActiveModel = user.into();
        if let Some(username) = changes.username {
            active.username = Set(username);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        if let Some(bio) = changes.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }

        active
            .update(conn)
            .await
            .map_err(|e| unique_or(e, "username", "A user with that username or email already exists"))
    }

    /// Delete a user and everything they authored
    pub async fn delete_user(&self, username: &str) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let user = UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::UserNotFound {
                username: username.to_string(),
            })?;

        // Comments on the user's reviews go with the reviews
        let review_ids = Query::select()
            .column(ReviewColumn::Id)
            .from(ReviewEntity)
            .and_where(Expr::col(ReviewColumn::AuthorId).eq(user.id))
            .to_owned();
        CommentEntity::delete_many()
            .filter(
                sea_orm::Condition::any()
                    .add(CommentColumn::AuthorId.eq(user.id))
                    .add(CommentColumn::ReviewId.in_subquery(review_ids)),
            )
            .exec(&txn)
            .await?;
        ReviewEntity::delete_many()
            .filter(ReviewColumn::AuthorId.eq(user.id))
            .exec(&txn)
            .await?;
        UserEntity::delete_by_id(user.id).exec(&txn).await?;

        txn.commit().await?;
        info!(user_id = user.id, username = %username, "User deleted");
        Ok(())
    }

    /// Register or re-register a user for a confirmation code.
    ///
    /// An existing (email, username) pair is a repeat request; any other
    /// overlap with an existing account is a uniqueness error.
    pub async fn signup_user(&self, email: &str, username: &str) -> Result<User> {
        let conn = self.write_conn();

        let by_username = UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(conn)
            .await?;

        if let Some(user) = by_username {
            if user.email != email {
                return Err(AppError::Duplicate {
                    message: "A user with that username already exists".to_string(),
                    field: "username".to_string(),
                });
            }
            debug!(user_id = user.id, "Repeated signup");
            if user.auth_state == AuthState::Pending {
                return Ok(user);
            }
            let mut active: UserActiveModel = user.into();
            active.auth_state = Set(AuthState::Pending);
            return active.update(conn).await.map_err(Into::into);
        }

        let email_taken = UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .count(conn)
            .await?
            > 0;
        if email_taken {
            return Err(AppError::Duplicate {
                message: "A user with that email already exists".to_string(),
                field: "email".to_string(),
            });
        }

        self.create_user(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            ..Default::default()
        })
        .await
    }

    /// Move a pending user to confirmed and stamp `last_login`.
    ///
    /// Returns `None` if the user was no longer pending, which makes
    /// a confirmation code usable once even under concurrent exchanges.
    pub async fn confirm_user(&self, user: &User) -> Result<Option<User>> {
        let now = Utc::now();
        let updated = UserEntity::update_many()
            .col_expr(UserColumn::AuthState, Expr::value(AuthState::Confirmed.as_str()))
            .col_expr(UserColumn::LastLogin, Expr::value(now))
            .filter(UserColumn::Id.eq(user.id))
            .filter(UserColumn::AuthState.eq(AuthState::Pending))
            .exec(self.write_conn())
            .await?;

        if updated.rows_affected == 0 {
            return Ok(None);
        }

        UserEntity::find_by_id(user.id)
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Category Operations
    // ========================================================================

    /// List categories, optionally filtered by a name substring
    pub async fn list_categories(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Category>> {
        let mut query = CategoryEntity::find();
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query = query.filter(icontains((CategoryEntity, CategoryColumn::Name), term));
        }
        paginate(self.read_conn(), query.order_by_asc(CategoryColumn::Id), page).await
    }

    pub async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        CategoryEntity::find()
            .filter(CategoryColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Create a category
    pub async fn create_category(&self, name: String, slug: String) -> Result<Category> {
        let conn = self.write_conn();
        if self.find_category_by_slug(&slug).await?.is_some() {
            return Err(duplicate_slug("category"));
        }

        let category = CategoryActiveModel {
            name: Set(name),
            slug: Set(slug),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(|e| unique_or(e, "slug", "A category with that slug already exists"))?;

        info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    /// Delete a category; its titles keep existing without one
    pub async fn delete_category(&self, slug: &str) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let category = CategoryEntity::find()
            .filter(CategoryColumn::Slug.eq(slug))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound {
                slug: slug.to_string(),
            })?;

        let detached = TitleEntity::update_many()
            .col_expr(TitleColumn::CategoryId, Expr::value(Option::<i32>::None))
            .filter(TitleColumn::CategoryId.eq(category.id))
            .exec(&txn)
            .await?;
        CategoryEntity::delete_by_id(category.id).exec(&txn).await?;

        txn.commit().await?;
        info!(
            category_id = category.id,
            titles_detached = detached.rows_affected,
            "Category deleted"
        );
        Ok(())
    }

    // ========================================================================
    // Genre Operations
    // ========================================================================

    /// List genres, optionally filtered by a name or slug substring
    pub async fn list_genres(&self, search: Option<&str>, page: PageRequest) -> Result<Page<Genre>> {
        let mut query = GenreEntity::find();
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query = query.filter(
                sea_orm::Condition::any()
                    .add(icontains((GenreEntity, GenreColumn::Name), term))
                    .add(icontains((GenreEntity, GenreColumn::Slug), term)),
            );
        }
        paginate(self.read_conn(), query.order_by_asc(GenreColumn::Id), page).await
    }

    pub async fn find_genre_by_slug(&self, slug: &str) -> Result<Option<Genre>> {
        GenreEntity::find()
            .filter(GenreColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Create a genre
    pub async fn create_genre(&self, name: String, slug: String) -> Result<Genre> {
        let conn = self.write_conn();
        if self.find_genre_by_slug(&slug).await?.is_some() {
            return Err(duplicate_slug("genre"));
        }

        let genre = GenreActiveModel {
            name: Set(name),
            slug: Set(slug),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(|e| unique_or(e, "slug", "A genre with that slug already exists"))?;

        info!(genre_id = genre.id, slug = %genre.slug, "Genre created");
        Ok(genre)
    }

    /// Delete a genre and its title associations only
    pub async fn delete_genre(&self, slug: &str) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        let genre = GenreEntity::find()
            .filter(GenreColumn::Slug.eq(slug))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::GenreNotFound {
                slug: slug.to_string(),
            })?;

        GenreTitleEntity::delete_many()
            .filter(GenreTitleColumn::GenreId.eq(genre.id))
            .exec(&txn)
            .await?;
        GenreEntity::delete_by_id(genre.id).exec(&txn).await?;

        txn.commit().await?;
        info!(genre_id = genre.id, "Genre deleted");
        Ok(())
    }

    // ========================================================================
    // Title Operations
    // ========================================================================

    pub async fn find_title(&self, id: i32) -> Result<Option<Title>> {
        TitleEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find title by ID or fail with 404
    pub async fn get_title(&self, id: i32) -> Result<Title> {
        self.find_title(id)
            .await?
            .ok_or(AppError::TitleNotFound { id })
    }

    /// List titles with filters, each with category, genres and rating
    pub async fn list_titles(
        &self,
        filter: &TitleFilter,
        page: PageRequest,
    ) -> Result<Page<TitleDetails>> {
        let mut query = TitleEntity::find();

        if let Some(ref slug) = filter.genre {
            let tagged = Query::select()
                .column((GenreTitleEntity, GenreTitleColumn::TitleId))
                .from(GenreTitleEntity)
                .inner_join(
                    GenreEntity,
                    Expr::col((GenreEntity, GenreColumn::Id))
                        .equals((GenreTitleEntity, GenreTitleColumn::GenreId)),
                )
                .and_where(Expr::col((GenreEntity, GenreColumn::Slug)).eq(slug.as_str()))
                .to_owned();
            query = query.filter(TitleColumn::Id.in_subquery(tagged));
        }
        if let Some(ref slug) = filter.category {
            query = query
                .join(JoinType::InnerJoin, title::Relation::Category.def())
                .filter(CategoryColumn::Slug.eq(slug.as_str()));
        }
        if let Some(ref name) = filter.name {
            query = query.filter(icontains((TitleEntity, TitleColumn::Name), name));
        }
        if let Some(year) = filter.year {
            query = query.filter(TitleColumn::Year.eq(year));
        }

        let conn = self.read_conn();
        let titles = paginate(conn, query.order_by_asc(TitleColumn::Id), page).await?;
        let details = load_details(conn, titles.items).await?;

        Ok(Page::new(details, titles.total, page))
    }

    /// Load a single title with category, genres and rating
    pub async fn get_title_details(&self, id: i32) -> Result<TitleDetails> {
        let conn = self.read_conn();
        let title = self.get_title(id).await?;
        load_details(conn, vec![title])
            .await?
            .pop()
            .ok_or(AppError::TitleNotFound { id })
    }

    /// Create a title, resolving its category and genres by slug
    pub async fn create_title(&self, new: NewTitle) -> Result<TitleDetails> {
        let txn = self.write_conn().begin().await?;

        let category_id = match new.category {
            Some(ref slug) => Some(resolve_category(&txn, slug).await?.id),
            None => None,
        };
        let genres = resolve_genres(&txn, &new.genres).await?;

        let title = TitleActiveModel {
            name: Set(new.name),
            year: Set(new.year),
            description: Set(new.description),
            category_id: Set(category_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        link_genres(&txn, title.id, &genres).await?;
        txn.commit().await?;

        info!(title_id = title.id, genres = genres.len(), "Title created");
        self.get_title_details(title.id).await
    }

    /// Apply a partial update to a title
    pub async fn update_title(&self, id: i32, changes: TitleChanges) -> Result<TitleDetails> {
        let txn = self.write_conn().begin().await?;

        let title = TitleEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::TitleNotFound { id })?;

        let touched = changes.name.is_some()
            || changes.year.is_some()
            || changes.description.is_some()
            || changes.category.is_some();

        let mut active: TitleActiveModel = title.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(year) = changes.year {
            active.year = Set(year);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        match changes.category {
            Some(Some(ref slug)) => {
                active.category_id = Set(Some(resolve_category(&txn, slug).await?.id));
            }
            Some(None) => active.category_id = Set(None),
            None => {}
        }
        if touched {
            active.update(&txn).await?;
        }

        if let Some(ref slugs) = changes.genres {
            let genres = resolve_genres(&txn, slugs).await?;
            GenreTitleEntity::delete_many()
                .filter(GenreTitleColumn::TitleId.eq(id))
                .exec(&txn)
                .await?;
            link_genres(&txn, id, &genres).await?;
        }

        txn.commit().await?;
        debug!(title_id = id, "Title updated");
        self.get_title_details(id).await
    }

    /// Delete a title with its genre links, reviews and their comments
    pub async fn delete_title(&self, id: i32) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        if TitleEntity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(AppError::TitleNotFound { id });
        }

        let review_ids = Query::select()
            .column(ReviewColumn::Id)
            .from(ReviewEntity)
            .and_where(Expr::col(ReviewColumn::TitleId).eq(id))
            .to_owned();
        CommentEntity::delete_many()
            .filter(CommentColumn::ReviewId.in_subquery(review_ids))
            .exec(&txn)
            .await?;
        ReviewEntity::delete_many()
            .filter(ReviewColumn::TitleId.eq(id))
            .exec(&txn)
            .await?;
        GenreTitleEntity::delete_many()
            .filter(GenreTitleColumn::TitleId.eq(id))
            .exec(&txn)
            .await?;
        TitleEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(title_id = id, "Title deleted");
        Ok(())
    }

    // ========================================================================
    // Review Operations
    // ========================================================================

    /// List reviews of a title
    pub async fn list_reviews(
        &self,
        title_id: i32,
        page: PageRequest,
    ) -> Result<Page<Authored<Review>>> {
        self.get_title(title_id).await?;

        let query = ReviewEntity::find()
            .filter(ReviewColumn::TitleId.eq(title_id))
            .order_by_asc(ReviewColumn::Id)
            .find_also_related(UserEntity);

        let paginator = query.paginate(self.read_conn(), page.page_size);
        let total = paginator.num_items().await?;
        page.check_in_range(total)?;
        let rows = paginator.fetch_page(page.index()).await?;

        Ok(Page::new(rows.into_iter().map(authored).collect(), total, page))
    }

    /// Find a review belonging to a title
    pub async fn get_review(&self, title_id: i32, review_id: i32) -> Result<Authored<Review>> {
        self.get_title(title_id).await?;

        ReviewEntity::find_by_id(review_id)
            .filter(ReviewColumn::TitleId.eq(title_id))
            .find_also_related(UserEntity)
            .one(self.read_conn())
            .await?
            .map(authored)
            .ok_or(AppError::ReviewNotFound { id: review_id })
    }

    /// Create a review; one per author per title
    pub async fn create_review(
        &self,
        title_id: i32,
        author: &User,
        text: String,
        score: i32,
    ) -> Result<Authored<Review>> {
        self.get_title(title_id).await?;
        let conn = self.write_conn();

        // Advisory; the unique index decides under concurrency
        let exists = ReviewEntity::find()
            .filter(ReviewColumn::TitleId.eq(title_id))
            .filter(ReviewColumn::AuthorId.eq(author.id))
            .count(conn)
            .await?
            > 0;
        if exists {
            return Err(AppError::DuplicateReview { title_id });
        }

        let review = insert_review(conn, title_id, author.id, text, score).await?;

        info!(review_id = review.id, title_id, author_id = author.id, "Review created");
        Ok(Authored {
            record: review,
            author: author.username.clone(),
        })
    }

    /// Update review text and/or score
    pub async fn update_review(
        &self,
        review: Authored<Review>,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<Authored<Review>> {
        if text.is_none() && score.is_none() {
            return Ok(review);
        }

        let mut active: ReviewActiveModel = review.record.into();
        if let Some(text) = text {
            active.text = Set(text);
        }
        if let Some(score) = score {
            active.score = Set(score);
        }
        let record = active.update(self.write_conn()).await?;

        Ok(Authored {
            record,
            author: review.author,
        })
    }

    /// Delete a review and its comments
    pub async fn delete_review(&self, review_id: i32) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        CommentEntity::delete_many()
            .filter(CommentColumn::ReviewId.eq(review_id))
            .exec(&txn)
            .await?;
        let deleted = ReviewEntity::delete_by_id(review_id).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            return Err(AppError::ReviewNotFound { id: review_id });
        }

        txn.commit().await?;
        info!(review_id, "Review deleted");
        Ok(())
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    /// List comments of a review
    pub async fn list_comments(
        &self,
        title_id: i32,
        review_id: i32,
        page: PageRequest,
    ) -> Result<Page<Authored<Comment>>> {
        self.get_review(title_id, review_id).await?;

        let query = CommentEntity::find()
            .filter(CommentColumn::ReviewId.eq(review_id))
            .order_by_asc(CommentColumn::Id)
            .find_also_related(UserEntity);

        let paginator = query.paginate(self.read_conn(), page.page_size);
        let total = paginator.num_items().await?;
        page.check_in_range(total)?;
        let rows = paginator.fetch_page(page.index()).await?;

        Ok(Page::new(rows.into_iter().map(authored).collect(), total, page))
    }

    /// Find a comment scoped to its title and review
    pub async fn get_comment(
        &self,
        title_id: i32,
        review_id: i32,
        comment_id: i32,
    ) -> Result<Authored<Comment>> {
        self.get_review(title_id, review_id).await?;

        CommentEntity::find_by_id(comment_id)
            .filter(CommentColumn::ReviewId.eq(review_id))
            .find_also_related(UserEntity)
            .one(self.read_conn())
            .await?
            .map(authored)
            .ok_or(AppError::CommentNotFound { id: comment_id })
    }

    /// Create a comment on a review of a title
    pub async fn create_comment(
        &self,
        title_id: i32,
        review_id: i32,
        author: &User,
        text: String,
    ) -> Result<Authored<Comment>> {
        self.get_review(title_id, review_id).await?;

        let comment = CommentActiveModel {
            text: Set(text),
            author_id: Set(author.id),
            review_id: Set(review_id),
            pub_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.write_conn())
        .await?;

        debug!(comment_id = comment.id, review_id, "Comment created");
        Ok(Authored {
            record: comment,
            author: author.username.clone(),
        })
    }

    /// Update comment text
    pub async fn update_comment(
        &self,
        comment: Authored<Comment>,
        text: Option<String>,
    ) -> Result<Authored<Comment>> {
        let record = match text {
            Some(text) => {
                let mut active: CommentActiveModel = comment.record.into();
                active.text = Set(text);
                active.update(self.write_conn()).await?
            }
            None => comment.record,
        };

        Ok(Authored {
            record,
            author: comment.author,
        })
    }

    pub async fn delete_comment(&self, comment_id: i32) -> Result<()> {
        let deleted = CommentEntity::delete_by_id(comment_id)
            .exec(self.write_conn())
            .await?;
        if deleted.rows_affected == 0 {
            return Err(AppError::CommentNotFound { id: comment_id });
        }
        debug!(comment_id, "Comment deleted");
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn paginate<C, E>(conn: &C, query: Select<E>, page: PageRequest) -> Result<Page<E::Model>>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Sync,
{
    let paginator = query.paginate(conn, page.page_size);
    let total = paginator.num_items().await?;
    page.check_in_range(total)?;
    let items = paginator.fetch_page(page.index()).await?;
    Ok(Page::new(items, total, page))
}

/// `LOWER(col) LIKE '%term%'` with LIKE wildcards in `term` escaped
fn icontains<T, C>(column: (T, C), term: &str) -> sea_orm::sea_query::SimpleExpr
where
    T: sea_orm::sea_query::IntoIden + 'static,
    C: sea_orm::sea_query::IntoIden + 'static,
{
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(format!("%{}%", escaped)).escape('\\'))
}

/// Insert a review, mapping a (title, author) index violation to `DuplicateReview`
async fn insert_review<C: ConnectionTrait>(
    conn: &C,
    title_id: i32,
    author_id: i32,
    text: String,
    score: i32,
) -> Result<Review> {
    ReviewActiveModel {
        text: Set(text),
        score: Set(score),
        author_id: Set(author_id),
        title_id: Set(title_id),
        pub_date: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateReview { title_id }
        } else {
            e.into()
        }
    })
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn unique_or(err: DbErr, field: &str, message: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Duplicate {
            message: message.to_string(),
            field: field.to_string(),
        }
    } else {
        err.into()
    }
}

fn duplicate_slug(kind: &str) -> AppError {
    AppError::Duplicate {
        message: format!("A {} with that slug already exists", kind),
        field: "slug".to_string(),
    }
}

fn authored<T>((record, author): (T, Option<User>)) -> Authored<T> {
    Authored {
        record,
        author: author.map(|u| u.username).unwrap_or_default(),
    }
}

async fn ensure_user_fields_free<C: ConnectionTrait>(
    conn: &C,
    except: Option<i32>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<()> {
    let taken = |column: UserColumn, value: &str| {
        let mut query = UserEntity::find().filter(column.eq(value));
        if let Some(id) = except {
            query = query.filter(UserColumn::Id.ne(id));
        }
        query
    };

    if let Some(username) = username {
        if taken(UserColumn::Username, username).count(conn).await? > 0 {
            return Err(AppError::Duplicate {
                message: "A user with that username already exists".to_string(),
                field: "username".to_string(),
            });
        }
    }
    if let Some(email) = email {
        if taken(UserColumn::Email, email).count(conn).await? > 0 {
            return Err(AppError::Duplicate {
                message: "A user with that email already exists".to_string(),
                field: "email".to_string(),
            });
        }
    }
    Ok(())
}

async fn resolve_category<C: ConnectionTrait>(conn: &C, slug: &str) -> Result<Category> {
    CategoryEntity::find()
        .filter(CategoryColumn::Slug.eq(slug))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::field("category", format!("Unknown category slug '{}'", slug)))
}

async fn resolve_genres<C: ConnectionTrait>(conn: &C, slugs: &[String]) -> Result<Vec<Genre>> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }

    let found = GenreEntity::find()
        .filter(GenreColumn::Slug.is_in(slugs.iter().map(String::as_str)))
        .order_by_asc(GenreColumn::Id)
        .all(conn)
        .await?;

    if let Some(missing) = slugs.iter().find(|s| !found.iter().any(|g| &g.slug == *s)) {
        return Err(AppError::field(
            "genre",
            format!("Unknown genre slug '{}'", missing),
        ));
    }
    Ok(found)
}

async fn link_genres<C: ConnectionTrait>(conn: &C, title_id: i32, genres: &[Genre]) -> Result<()> {
    if genres.is_empty() {
        return Ok(());
    }
    let links = genres.iter().map(|g| GenreTitleActiveModel {
        genre_id: Set(g.id),
        title_id: Set(title_id),
        ..Default::default()
    });
    GenreTitleEntity::insert_many(links)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Attach category, genres and rating to a batch of titles
async fn load_details<C: ConnectionTrait>(conn: &C, titles: Vec<Title>) -> Result<Vec<TitleDetails>> {
    if titles.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = titles.iter().map(|t| t.id).collect();

    let category_ids: Vec<i32> = titles.iter().filter_map(|t| t.category_id).collect();
    let categories: HashMap<i32, Category> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        CategoryEntity::find()
            .filter(CategoryColumn::Id.is_in(category_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };

    let mut genres: HashMap<i32, Vec<Genre>> = HashMap::new();
    let links = GenreTitleEntity::find()
        .filter(GenreTitleColumn::TitleId.is_in(ids.clone()))
        .order_by_asc(GenreTitleColumn::GenreId)
        .find_also_related(GenreEntity)
        .all(conn)
        .await?;
    for (link, genre) in links {
        if let Some(genre) = genre {
            genres.entry(link.title_id).or_default().push(genre);
        }
    }

    let ratings = ratings_for(conn, ids).await?;

    Ok(titles
        .into_iter()
        .map(|title| TitleDetails {
            category: title.category_id.and_then(|id| categories.get(&id).cloned()),
            genres: genres.remove(&title.id).unwrap_or_default(),
            rating: ratings.get(&title.id).copied(),
            title,
        })
        .collect())
}

/// Mean review score per title; titles without reviews are absent
async fn ratings_for<C: ConnectionTrait>(conn: &C, ids: Vec<i32>) -> Result<HashMap<i32, f64>> {
    let totals = ReviewEntity::find()
        .select_only()
        .column(ReviewColumn::TitleId)
        .column_as(Expr::col(ReviewColumn::Score).sum(), "total")
        .column_as(Expr::col(ReviewColumn::Id).count(), "reviews")
        .filter(ReviewColumn::TitleId.is_in(ids))
        .group_by(ReviewColumn::TitleId)
        .into_model::<ScoreTotals>()
        .all(conn)
        .await?;

    Ok(totals
        .into_iter()
        .filter(|t| t.reviews > 0)
        .map(|t| (t.title_id, t.total as f64 / t.reviews as f64))
        .collect())
}
