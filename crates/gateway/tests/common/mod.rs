//! Shared harness: the real router over in-memory SQLite

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use sea_orm::{ConnectOptions, Database};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;
use yamdb_common::{
    config::AppConfig,
    db::{models::{Role, User}, schema::create_schema, DbPool, NewUser, Repository},
    mail::MemoryMailer,
};
use yamdb_gateway::{build_app, AppState};

pub struct TestApp {
    pub app: NormalizePath<Router>,
    pub state: AppState,
    pub mailer: MemoryMailer,
}

pub async fn spawn() -> TestApp {
    spawn_with(|_| {}).await
}

pub async fn spawn_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = Some("integration-test-secret".to_string());
    config.rate_limit.enabled = false;
    customize(&mut config);

    // One connection: every pooled connection to :memory: is its own database
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let conn = Database::connect(opts).await.expect("sqlite connect");
    create_schema(&conn).await.expect("schema");

    let mailer = MemoryMailer::new();
    let state = AppState::new(
        Arc::new(config),
        DbPool::from_connection(conn),
        Arc::new(mailer.clone()),
    )
    .expect("state");

    TestApp {
        app: build_app(state.clone()),
        state,
        mailer,
    }
}

impl TestApp {
    pub fn repo(&self) -> Repository {
        self.state.repo()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Insert a user directly and mint a token for them
    pub async fn user(&self, username: &str, role: Role) -> (User, String) {
        let user = self
            .repo()
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                role,
                ..Default::default()
            })
            .await
            .expect("create user");
        let token = self.state.jwt.generate_token(&user).expect("token");
        (user, token)
    }

    pub async fn admin(&self) -> String {
        self.user("admin", Role::Admin).await.1
    }

    /// Category "drama", genres "comedy" and "drama"
    pub async fn seed_taxonomy(&self, admin: &str) {
        for (path, name, slug) in [
            ("/v1/categories/", "Drama", "drama"),
            ("/v1/genres/", "Comedy", "comedy"),
            ("/v1/genres/", "Drama", "drama"),
        ] {
            let (status, _) = self
                .post(path, Some(admin), serde_json::json!({"name": name, "slug": slug}))
                .await;
            assert_eq!(status, StatusCode::CREATED, "seeding {}{}", path, slug);
        }
    }

    /// Create a title through the API and return its id
    pub async fn title(&self, admin: &str, name: &str, year: i32) -> i64 {
        let (status, body) = self
            .post(
                "/v1/titles/",
                Some(admin),
                serde_json::json!({
                    "name": name,
                    "year": year,
                    "category": "drama",
                    "genre": ["comedy", "drama"],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().expect("title id")
    }
}
