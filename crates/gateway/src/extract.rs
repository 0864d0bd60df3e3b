//! Extractors that reject with the API error envelope

use axum::extract::{FromRequest, FromRequestParts};
use yamdb_common::errors::AppError;

/// JSON body; malformed bodies become a 400 `INVALID_FORMAT`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path parameters; e.g. a non-numeric title id is a 400
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
