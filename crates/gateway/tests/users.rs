mod common;

use axum::http::StatusCode;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use yamdb_common::db::models::{Role, UserActiveModel};

#[tokio::test]
async fn test_user_admin_access() {
    let app = common::spawn().await;
    let admin = app.admin().await;
    let (_, user) = app.user("reader", Role::User).await;
    let (_, moderator) = app.user("mod", Role::Moderator).await;

    let (status, _) = app.get("/v1/users/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/v1/users/", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/v1/users/", Some(&moderator)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/v1/users/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (_, body) = app.get("/v1/users/?search=rea", Some(&admin)).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["username"], "reader");
}

#[tokio::test]
async fn test_staff_flag_grants_admin() {
    let app = common::spawn().await;
    let (staff, _) = app.user("staffer", Role::User).await;

    let mut active: UserActiveModel = staff.into();
    active.is_staff = Set(true);
    let staff = active.update(app.state.db.write()).await.unwrap();
    let token = app.state.jwt.generate_token(&staff).unwrap();

    let (status, _) = app.get("/v1/users/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_user_crud() {
    let app = common::spawn().await;
    let admin = app.admin().await;

    let (status, body) = app
        .post(
            "/v1/users/",
            Some(&admin),
            json!({"username": "newbie", "email": "newbie@example.com", "bio": "Hi", "role": "moderator"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "moderator");
    assert_eq!(body["bio"], "Hi");
    assert_eq!(body["first_name"], "");

    let (status, _) = app
        .post(
            "/v1/users/",
            Some(&admin),
            json!({"username": "newbie", "email": "another@example.com"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .patch("/v1/users/newbie/", Some(&admin), json!({"first_name": "New", "role": "user"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "New");
    assert_eq!(body["role"], "user");

    let (status, body) = app.get("/v1/users/newbie/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "newbie@example.com");

    let (status, _) = app.delete("/v1/users/newbie/", Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get("/v1/users/newbie/", Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_field_validation() {
    let app = common::spawn().await;
    let admin = app.admin().await;

    let (status, body) = app
        .post("/v1/users/", Some(&admin), json!({"username": "me", "email": "me@example.com"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["username"].is_array());

    let (status, _) = app
        .post(
            "/v1/users/",
            Some(&admin),
            json!({"username": "ok", "email": "ok@example.com", "role": "superuser"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_endpoint() {
    let app = common::spawn().await;
    let (_, user) = app.user("reader", Role::User).await;
    let (_, moderator) = app.user("mod", Role::Moderator).await;

    let (status, _) = app.get("/v1/users/me/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/v1/users/me/", Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "reader");

    // Plain users cannot edit themselves
    let (status, _) = app.patch("/v1/users/me/", Some(&user), json!({"bio": "New bio"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .patch("/v1/users/me/", Some(&moderator), json!({"bio": "Keeps order"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Keeps order");

    // Role changes need an admin, even for oneself
    let (status, _) = app
        .patch("/v1/users/me/", Some(&moderator), json!({"role": "admin"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Restating the current role is not a change
    let (status, _) = app
        .patch("/v1/users/me/", Some(&moderator), json!({"role": "moderator"}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_deleted_user_token_rejected() {
    let app = common::spawn().await;
    let admin = app.admin().await;
    let (_, token) = app.user("leaving", Role::User).await;

    app.delete("/v1/users/leaving/", Some(&admin)).await;

    let (status, _) = app.get("/v1/users/me/", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_trailing_slash_optional() {
    let app = common::spawn().await;
    let admin = app.admin().await;

    let (with_slash, _) = app.get("/v1/users/", Some(&admin)).await;
    let (without, _) = app.get("/v1/users", Some(&admin)).await;
    assert_eq!(with_slash, StatusCode::OK);
    assert_eq!(without, StatusCode::OK);
}
