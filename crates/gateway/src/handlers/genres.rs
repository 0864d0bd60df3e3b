//! Genre handlers

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use yamdb_common::{
    auth::policy,
    db::models::Genre,
    errors::Result,
    validation::validate_slug,
};

use super::common::{page_request, ListQuery, Paginated};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::Viewer;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct GenreResponse {
    pub name: String,
    pub slug: String,
}

impl From<Genre> for GenreResponse {
    fn from(genre: Genre) -> Self {
        Self {
            name: genre.name,
            slug: genre.slug,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGenreRequest {
    #[validate(length(min = 1, max = 32))]
    pub name: String,

    #[validate(length(min = 1, max = 50), custom(function = "validate_slug"))]
    pub slug: String,
}

pub async fn list_genres(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<Paginated<GenreResponse>>> {
    policy::admin_or_read_only(viewer.actor(), &Method::GET).require()?;

    let page = page_request(&state, query.page)?;
    let genres = state
        .repo()
        .list_genres(query.search.as_deref(), page)
        .await?;

    Ok(Json(Paginated::new(genres.map(GenreResponse::from), &uri)))
}

pub async fn create_genre(
    State(state): State<AppState>,
    viewer: Viewer,
    AppJson(request): AppJson<CreateGenreRequest>,
) -> Result<(StatusCode, Json<GenreResponse>)> {
    policy::admin_or_read_only(viewer.actor(), &Method::POST).require()?;
    request.validate()?;

    let genre = state.repo().create_genre(request.name, request.slug).await?;
    Ok((StatusCode::CREATED, Json(genre.into())))
}

/// Delete by slug; titles keep their other genres
pub async fn delete_genre(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath(slug): AppPath<String>,
) -> Result<StatusCode> {
    policy::admin_or_read_only(viewer.actor(), &Method::DELETE).require()?;

    state.repo().delete_genre(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}
