//! User administration and self-service handlers

use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use yamdb_common::{
    auth::policy,
    db::{models::{Role, User}, NewUser, UserChanges},
    errors::Result,
    validation::validate_username,
};

use super::common::{page_request, ListQuery, Paginated};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::Viewer;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub bio: Option<String>,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            bio: user.bio,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,

    #[serde(default)]
    pub role: Role,

    pub bio: Option<String>,

    #[validate(length(max = 150))]
    #[serde(default)]
    pub first_name: String,

    #[validate(length(max = 150))]
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: Option<String>,

    #[validate(email, length(max = 254))]
    pub email: Option<String>,

    pub role: Option<Role>,

    pub bio: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(request: UpdateUserRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            role: request.role,
            bio: request.bio,
            first_name: request.first_name,
            last_name: request.last_name,
        }
    }
}

/// List users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<Paginated<UserResponse>>> {
    policy::user_admin(viewer.actor()).require()?;

    let page = page_request(&state, query.page)?;
    let users = state.repo().list_users(query.search.as_deref(), page).await?;

    Ok(Json(Paginated::new(users.map(UserResponse::from), &uri)))
}

/// Create a user (admin)
pub async fn create_user(
    State(state): State<AppState>,
    viewer: Viewer,
    AppJson(request): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    policy::user_admin(viewer.actor()).require()?;
    request.validate()?;

    let user = state
        .repo()
        .create_user(NewUser {
            username: request.username,
            email: request.email,
            role: request.role,
            bio: request.bio,
            first_name: request.first_name,
            last_name: request.last_name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Get a user by username (admin)
pub async fn get_user(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath(username): AppPath<String>,
) -> Result<Json<UserResponse>> {
    policy::user_admin(viewer.actor()).require()?;

    let user = state.repo().get_user(&username).await?;
    Ok(Json(user.into()))
}

/// Update a user by username (admin)
pub async fn update_user(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath(username): AppPath<String>,
    AppJson(request): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    policy::user_admin(viewer.actor()).require()?;
    request.validate()?;

    let repo = state.repo();
    let user = repo.get_user(&username).await?;
    let user = repo.update_user(user, request.into()).await?;

    tracing::info!(user_id = user.id, "User updated");
    Ok(Json(user.into()))
}

/// Delete a user by username (admin)
pub async fn delete_user(
    State(state): State<AppState>,
    viewer: Viewer,
    AppPath(username): AppPath<String>,
) -> Result<StatusCode> {
    policy::user_admin(viewer.actor()).require()?;

    state.repo().delete_user(&username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own profile
pub async fn get_me(viewer: Viewer) -> Result<Json<UserResponse>> {
    policy::self_service(viewer.actor(), &Method::GET, false).require()?;

    let user = viewer.require_user()?.clone();
    Ok(Json(user.into()))
}

/// Edit the caller's own profile (moderators and admins)
pub async fn update_me(
    State(state): State<AppState>,
    viewer: Viewer,
    AppJson(request): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    let changes_role = match (viewer.user(), request.role) {
        (Some(user), Some(role)) => user.role != role,
        _ => false,
    };
    policy::self_service(viewer.actor(), &Method::PATCH, changes_role).require()?;
    request.validate()?;

    let user = viewer.require_user()?.clone();
    let user = state.repo().update_user(user, request.into()).await?;

    Ok(Json(user.into()))
}
