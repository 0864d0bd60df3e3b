//! Comment handlers, nested under reviews

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
    db::{models::Comment, Authored},
    errors::Result,
};

use super::common::{page_request, ListQuery, Paginated};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::Viewer;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub pub_date: DateTime<Utc>,
}

impl From<Authored<Comment>> for CommentResponse {
    fn from(comment: Authored<Comment>) -> Self {
        Self {
            id: comment.record.id,
            text: comment.record.text,
            author: comment.author,
            pub_date: comment.record.pub_date,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1))]
    pub text: Option<String>,
}

pub async fn list_comments(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    AppPath((title_id, review_id)): AppPath<(i32, i32)>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<Paginated<CommentResponse>>> {
    policy::author_or_staff(viewer.actor(), &Method::GET, false).require()?;

    let page = page_request(&state, query.page)?;
    let comments = state.repo().list_comments(title_id, review_id, page).await?;

    Ok(Json(Paginated::new(comments.map(CommentResponse::from), &uri)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath((title_id, review_id, comment_id)): AppPath<(i32, i32, i32)>,
) -> Result<Json<CommentResponse>> {
    policy::author_or_staff(viewer.actor(), &Method::GET, false).require()?;

    let comment = state
        .repo()
        .get_comment(title_id, review_id, comment_id)
        .await?;
    Ok(Json(comment.into()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath((title_id, review_id)): AppPath<(i32, i32)>,
    AppJson(request): AppJson<CommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    policy::author_or_staff(viewer.actor(), &Method::POST, false).require()?;
    request.validate()?;

    let author = viewer.require_user()?;
    let comment = state
        .repo()
        .create_comment(title_id, review_id, author, request.text)
        .await?;

    Ok((StatusCode::CREATED, Json(comment.into())))
}

pub async fn update_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath((title_id, review_id, comment_id)): AppPath<(i32, i32, i32)>,
    AppJson(request): AppJson<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>> {
    viewer.require_user()?;

    let repo = state.repo();
    let comment = repo.get_comment(title_id, review_id, comment_id).await?;
    let is_author = viewer.is_author(comment.record.author_id);
    policy::author_or_staff(viewer.actor(), &Method::PATCH, is_author).require()?;
    request.validate()?;

    let comment = repo.update_comment(comment, request.text).await?;
    Ok(Json(comment.into()))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath((title_id, review_id, comment_id)): AppPath<(i32, i32, i32)>,
) -> Result<StatusCode> {
    viewer.require_user()?;

    let repo = state.repo();
    let comment = repo.get_comment(title_id, review_id, comment_id).await?;
    let is_author = viewer.is_author(comment.record.author_id);
    policy::author_or_staff(viewer.actor(), &Method::DELETE, is_author).require()?;

    repo.delete_comment(comment.record.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
