//! Category handlers

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use yamdb_common::{
    auth::policy,
    db::models::Category,
    errors::Result,
    validation::validate_slug,
};

use super::common::{page_request, ListQuery, Paginated};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::Viewer;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub name: String,
    pub slug: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            name: category.name,
            slug: category.slug,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,

    #[validate(length(min = 1, max = 50), custom(function = "validate_slug"))]
    pub slug: String,
}

pub async fn list_categories(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<Paginated<CategoryResponse>>> {
    policy::admin_or_read_only(viewer.actor(), &Method::GET).require()?;

    let page = page_request(&state, query.page)?;
    let categories = state
        .repo()
        .list_categories(query.search.as_deref(), page)
        .await?;

    Ok(Json(Paginated::new(categories.map(CategoryResponse::from), &uri)))
}

pub async fn create_category(
    State(state): State<AppState>,
    viewer: Viewer,
    AppJson(request): AppJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    policy::admin_or_read_only(viewer.actor(), &Method::POST).require()?;
    request.validate()?;

    let category = state.repo().create_category(request.name, request.slug).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// Delete by slug; titles in the category lose it
pub async fn delete_category(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath(slug): AppPath<String>,
) -> Result<StatusCode> {
    policy::admin_or_read_only(viewer.actor(), &Method::DELETE).require()?;

    state.repo().delete_category(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}
