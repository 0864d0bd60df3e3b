//! Signup and token exchange handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;
use yamdb_common::{
    errors::{AppError, Result},
    mail::OutgoingMail,
    metrics,
    validation::validate_username,
};

use crate::extract::AppJson;
use crate::AppState;

/// Request a confirmation code
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub email: String,
    pub username: String,
}

/// Exchange a confirmation code for an access token
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,

    #[validate(length(min = 1))]
    pub confirmation_code: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Register (or re-register) and email a confirmation code
pub async fn signup(
    State(state): State<AppState>,
    AppJson(request): AppJson<SignupRequest>,
) -> Result<Json<SignupResponse>> {
    request.validate()?;

    let repo = state.repo();
    let repeat = repo.find_user_by_username(&request.username).await?.is_some();
    let user = repo.signup_user(&request.email, &request.username).await?;

    let code = state.codes.issue(&user)?;
    state
        .mailer
        .send(OutgoingMail::confirmation_code(
            &state.config.mail.from_address,
            &user.email,
            &user.username,
            &code,
        ))
        .await?;

    metrics::record_signup(repeat);
    tracing::info!(user_id = user.id, repeat, "Confirmation code sent");

    Ok(Json(SignupResponse {
        email: user.email,
        username: user.username,
    }))
}

/// Confirm a pending user and issue an access token
pub async fn token(
    State(state): State<AppState>,
    AppJson(request): AppJson<TokenRequest>,
) -> Result<Json<TokenResponse>> {
    request.validate()?;

    let repo = state.repo();
    let user = repo.get_user(&request.username).await?;

    let invalid_code = || AppError::field("confirmation_code", "Invalid confirmation code");

    if !state.codes.verify(&user, &request.confirmation_code) {
        tracing::warn!(user_id = user.id, "Confirmation code rejected");
        return Err(invalid_code());
    }

    // Lost a race with another exchange of the same code
    let user = repo.confirm_user(&user).await?.ok_or_else(invalid_code)?;

    let token = state.jwt.generate_token(&user)?;
    metrics::record_token_issued();
    tracing::info!(user_id = user.id, "Access token issued");

    Ok(Json(TokenResponse { token }))
}
