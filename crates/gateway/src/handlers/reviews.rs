//! Review handlers, nested under titles

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use yamdb_common::{
    auth::policy,
    db::{models::Review, Authored},
    errors::Result,
    metrics,
};

use super::common::{page_request, ListQuery, Paginated};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::Viewer;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: i32,
    pub text: String,
    /// Author's username
    pub author: String,
    pub score: i32,
    pub pub_date: DateTime<Utc>,
}

impl From<Authored<Review>> for ReviewResponse {
    fn from(review: Authored<Review>) -> Self {
        Self {
            id: review.record.id,
            text: review.record.text,
            author: review.author,
            score: review.record.score,
            pub_date: review.record.pub_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1))]
    pub text: String,

    #[validate(range(min = 1, max = 10))]
    pub score: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1))]
    pub text: Option<String>,

    #[validate(range(min = 1, max = 10))]
    pub score: Option<i32>,
}

pub async fn list_reviews(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    AppPath(title_id): AppPath<i32>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<Paginated<ReviewResponse>>> {
    policy::author_or_staff(viewer.actor(), &Method::GET, false).require()?;

    let page = page_request(&state, query.page)?;
    let reviews = state.repo().list_reviews(title_id, page).await?;

    Ok(Json(Paginated::new(reviews.map(ReviewResponse::from), &uri)))
}

pub async fn get_review(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath((title_id, review_id)): AppPath<(i32, i32)>,
) -> Result<Json<ReviewResponse>> {
    policy::author_or_staff(viewer.actor(), &Method::GET, false).require()?;

    let review = state.repo().get_review(title_id, review_id).await?;
    Ok(Json(review.into()))
}

/// One review per user per title
pub async fn create_review(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath(title_id): AppPath<i32>,
    AppJson(request): AppJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    policy::author_or_staff(viewer.actor(), &Method::POST, false).require()?;
    request.validate()?;

    let author = viewer.require_user()?;
    let review = state
        .repo()
        .create_review(title_id, author, request.text, request.score)
        .await?;

    metrics::record_review_created(review.record.score);
    Ok((StatusCode::CREATED, Json(review.into())))
}

/// Author, moderator or admin
pub async fn update_review(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath((title_id, review_id)): AppPath<(i32, i32)>,
    AppJson(request): AppJson<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>> {
    viewer.require_user()?;

    let repo = state.repo();
    let review = repo.get_review(title_id, review_id).await?;
    let is_author = viewer.is_author(review.record.author_id);
    policy::author_or_staff(viewer.actor(), &Method::PATCH, is_author).require()?;
    request.validate()?;

    let review = repo.update_review(review, request.text, request.score).await?;
    Ok(Json(review.into()))
}

/// Author, moderator or admin; comments go with the review
pub async fn delete_review(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath((title_id, review_id)): AppPath<(i32, i32)>,
) -> Result<StatusCode> {
    viewer.require_user()?;

    let repo = state.repo();
    let review = repo.get_review(title_id, review_id).await?;
    let is_author = viewer.is_author(review.record.author_id);
    policy::author_or_staff(viewer.actor(), &Method::DELETE, is_author).require()?;

    repo.delete_review(review.record.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
