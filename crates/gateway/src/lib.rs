//! YaMDb API Gateway
//!
//! HTTP surface for the review platform:
//! - Signup and token exchange
//! - Users, categories, genres and titles
//! - Reviews and comments nested under titles
//! - Observability (logging, metrics, tracing)

pub mod extract;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::Layer;
use tower_http::{
    cors::{Any, CorsLayer},
    normalize_path::{NormalizePath, NormalizePathLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use yamdb_common::{
    auth::{ConfirmationCodes, JwtManager},
    config::AppConfig,
    db::{DbPool, Repository},
    errors::Result,
    mail::Mailer,
};

use middleware::rate_limit::{create_rate_limiter, rate_limit_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub codes: Arc<ConfirmationCodes>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Build state from configuration; fails without a signing secret
    pub fn new(config: Arc<AppConfig>, db: DbPool, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let secret = config.jwt_secret()?;
        let jwt = JwtManager::new(secret, config.auth.jwt_expiration_secs);
        let codes = ConfirmationCodes::new(secret, config.auth.confirmation_ttl_secs);

        Ok(Self {
            jwt: Arc::new(jwt),
            codes: Arc::new(codes),
            config,
            db,
            mailer,
        })
    }

    pub fn repo(&self) -> Repository {
        Repository::new(self.db.clone())
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Signup and token exchange
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/token", post(handlers::auth::token))

        // Users
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/me",
            get(handlers::users::get_me).patch(handlers::users::update_me),
        )
        .route(
            "/users/{username}",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )

        // Taxonomy
        .route(
            "/categories",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route("/categories/{slug}", delete(handlers::categories::delete_category))
        .route(
            "/genres",
            get(handlers::genres::list_genres).post(handlers::genres::create_genre),
        )
        .route("/genres/{slug}", delete(handlers::genres::delete_genre))

        // Titles
        .route(
            "/titles",
            get(handlers::titles::list_titles).post(handlers::titles::create_title),
        )
        .route(
            "/titles/{title_id}",
            get(handlers::titles::get_title)
                .patch(handlers::titles::update_title)
                .delete(handlers::titles::delete_title),
        )

        // Reviews
        .route(
            "/titles/{title_id}/reviews",
            get(handlers::reviews::list_reviews).post(handlers::reviews::create_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(handlers::reviews::get_review)
                .patch(handlers::reviews::update_review)
                .delete(handlers::reviews::delete_review),
        )

        // Comments
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(handlers::comments::list_comments).post(handlers::comments::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(handlers::comments::get_comment)
                .patch(handlers::comments::update_comment)
                .delete(handlers::comments::delete_comment),
        );

    let mut app = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .route_layer(from_fn(middleware::metrics::track_metrics));

    if state.config.rate_limit.enabled {
        let limiter = create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        app = app.layer(from_fn_with_state(limiter, rate_limit_middleware));
    }

    app.layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// The router wrapped so `/v1/titles/` and `/v1/titles` route alike
pub fn build_app(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(create_router(state))
}
