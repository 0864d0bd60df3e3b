//! Bearer token authentication

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use yamdb_common::{
    auth::{extract_bearer, Actor},
    db::models::User,
    errors::{AppError, Result},
};

use crate::AppState;

/// The caller behind a request, if it presented a token.
///
/// A missing `Authorization` header is anonymous; a header that is present
/// but invalid, expired or names a deleted user is rejected with 401.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn actor(&self) -> Actor {
        Actor::of(self.0.as_ref())
    }

    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    /// The authenticated user, or 401
    pub fn require_user(&self) -> Result<&User> {
        self.0.as_ref().ok_or_else(|| AppError::Unauthorized {
            message: "Authentication credentials were not provided".to_string(),
        })
    }

    /// Whether the caller wrote something with this author id
    pub fn is_author(&self, author_id: i32) -> bool {
        self.0.as_ref().is_some_and(|u| u.id == author_id)
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Viewer(None));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(extract_bearer)
            .ok_or(AppError::InvalidToken)?;

        let claims = state.jwt.validate_token(token)?;
        let user = state
            .repo()
            .find_user_by_id(claims.user_id()?)
            .await?
            .ok_or(AppError::InvalidToken)?;

        tracing::debug!(user_id = user.id, jti = %claims.jti, "Request authenticated");
        Ok(Viewer(Some(user)))
    }
}
