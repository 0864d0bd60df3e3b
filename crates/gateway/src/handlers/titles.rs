//! Title handlers

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use yamdb_common::{
    auth::policy,
    db::{NewTitle, TitleChanges, TitleDetails, TitleFilter},
    errors::Result,
    validation::validate_year,
};

use super::categories::CategoryResponse;
use super::common::{nullable, page_request, Paginated};
use super::genres::GenreResponse;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::Viewer;
use crate::AppState;

/// Read representation, also returned from writes
#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub id: i32,
    pub name: String,
    pub year: i32,
    /// Mean review score; null without reviews
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<GenreResponse>,
    pub category: Option<CategoryResponse>,
}

impl From<TitleDetails> for TitleResponse {
    fn from(details: TitleDetails) -> Self {
        Self {
            id: details.title.id,
            name: details.title.name,
            year: details.title.year,
            rating: details.rating,
            description: details.title.description,
            genre: details.genres.into_iter().map(GenreResponse::from).collect(),
            category: details.category.map(CategoryResponse::from),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TitleQuery {
    pub page: Option<u64>,
    pub genre: Option<String>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

/// Category and genres are referenced by slug
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTitleRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,

    #[validate(custom(function = "validate_year"))]
    pub year: i32,

    #[validate(length(max = 200))]
    pub description: Option<String>,

    #[serde(default)]
    pub genre: Vec<String>,

    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_year"))]
    pub year: Option<i32>,

    /// `null` clears the description
    #[validate(length(max = 200))]
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    /// Replaces the whole genre set
    pub genre: Option<Vec<String>>,

    /// `null` detaches the category
    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,
}

/// List titles with optional genre/category/name/year filters
pub async fn list_titles(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    AppQuery(query): AppQuery<TitleQuery>,
) -> Result<Json<Paginated<TitleResponse>>> {
    policy::admin_or_read_only(viewer.actor(), &Method::GET).require()?;

    let page = page_request(&state, query.page)?;
    let filter = TitleFilter {
        genre: query.genre,
        category: query.category,
        name: query.name.filter(|n| !n.is_empty()),
        year: query.year,
    };

    let titles = state.repo().list_titles(&filter, page).await?;
    Ok(Json(Paginated::new(titles.map(TitleResponse::from), &uri)))
}

pub async fn get_title(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath(title_id): AppPath<i32>,
) -> Result<Json<TitleResponse>> {
    policy::admin_or_read_only(viewer.actor(), &Method::GET).require()?;

    let details = state.repo().get_title_details(title_id).await?;
    Ok(Json(details.into()))
}

pub async fn create_title(
    State(state): State<AppState>,
    viewer: Viewer,
    AppJson(request): AppJson<CreateTitleRequest>,
) -> Result<(StatusCode, Json<TitleResponse>)> {
    policy::admin_or_read_only(viewer.actor(), &Method::POST).require()?;
    request.validate()?;

    let details = state
        .repo()
        .create_title(NewTitle {
            name: request.name,
            year: request.year,
            description: request.description,
            category: request.category,
            genres: request.genre,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(details.into())))
}

pub async fn update_title(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath(title_id): AppPath<i32>,
    AppJson(request): AppJson<UpdateTitleRequest>,
) -> Result<Json<TitleResponse>> {
    policy::admin_or_read_only(viewer.actor(), &Method::PATCH).require()?;
    request.validate()?;

    let details = state
        .repo()
        .update_title(
            title_id,
            TitleChanges {
                name: request.name,
                year: request.year,
                description: request.description,
                category: request.category,
                genres: request.genre,
            },
        )
        .await?;

    Ok(Json(details.into()))
}

/// Delete a title with its reviews and their comments
pub async fn delete_title(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath(title_id): AppPath<i32>,
) -> Result<StatusCode> {
    policy::admin_or_read_only(viewer.actor(), &Method::DELETE).require()?;

    state.repo().delete_title(title_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
