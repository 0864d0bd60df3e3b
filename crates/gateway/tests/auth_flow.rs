mod common;

use axum::http::StatusCode;
use serde_json::json;
use yamdb_common::db::models::Role;

/// Pull the code out of the last mail sent to `address`
fn code_from_mail(app: &common::TestApp, address: &str) -> String {
    let mail = app.mailer.last_to(address).expect("confirmation mail");
    mail.body
        .lines()
        .find_map(|l| l.strip_prefix("Your confirmation code: "))
        .expect("code line")
        .trim()
        .to_string()
}

#[tokio::test]
async fn test_signup_then_token() {
    let app = common::spawn().await;

    let (status, body) = app
        .post("/v1/auth/signup/", None, json!({"email": "ann@example.com", "username": "ann"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"email": "ann@example.com", "username": "ann"}));

    let mail = app.mailer.last_to("ann@example.com").unwrap();
    assert_eq!(mail.from, "noreply@yamdb.local");
    let code = code_from_mail(&app, "ann@example.com");

    let (status, body) = app
        .post("/v1/auth/token/", None, json!({"username": "ann", "confirmation_code": code}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    // The token authenticates the user
    let (status, me) = app.get("/v1/users/me/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "ann");
    assert_eq!(me["role"], "user");
}

#[tokio::test]
async fn test_code_is_single_use() {
    let app = common::spawn().await;
    app.post("/v1/auth/signup/", None, json!({"email": "bo@example.com", "username": "bo"}))
        .await;
    let code = code_from_mail(&app, "bo@example.com");
    let exchange = json!({"username": "bo", "confirmation_code": code});

    let (first, _) = app.post("/v1/auth/token/", None, exchange.clone()).await;
    let (second, body) = app.post("/v1/auth/token/", None, exchange).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["confirmation_code"].is_array());
}

#[tokio::test]
async fn test_wrong_code_and_unknown_user() {
    let app = common::spawn().await;
    app.post("/v1/auth/signup/", None, json!({"email": "cy@example.com", "username": "cy"}))
        .await;

    let (status, body) = app
        .post("/v1/auth/token/", None, json!({"username": "cy", "confirmation_code": "1-deadbeef"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["confirmation_code"].is_array());

    let (status, _) = app
        .post("/v1/auth/token/", None, json!({"username": "ghost", "confirmation_code": "x"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signup_validation() {
    let app = common::spawn().await;

    let (status, body) = app
        .post("/v1/auth/signup/", None, json!({"email": "me@example.com", "username": "me"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["username"].is_array());

    let (status, body) = app
        .post("/v1/auth/signup/", None, json!({"email": "not-an-email", "username": "dee"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["email"].is_array());

    let (status, body) = app.post("/v1/auth/signup/", None, json!({"email": "x@example.com"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_FORMAT");
}

#[tokio::test]
async fn test_repeat_signup_and_conflicts() {
    let app = common::spawn().await;
    let signup = json!({"email": "eve@example.com", "username": "eve"});

    let (first, _) = app.post("/v1/auth/signup/", None, signup.clone()).await;
    let (again, _) = app.post("/v1/auth/signup/", None, signup).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(again, StatusCode::OK);
    assert_eq!(app.mailer.sent().len(), 2);

    let (status, body) = app
        .post("/v1/auth/signup/", None, json!({"email": "other@example.com", "username": "eve"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["username"].is_array());

    let (status, body) = app
        .post("/v1/auth/signup/", None, json!({"email": "eve@example.com", "username": "eve2"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["email"].is_array());
}

#[tokio::test]
async fn test_resignup_issues_fresh_code() {
    let app = common::spawn().await;
    let signup = json!({"email": "fay@example.com", "username": "fay"});

    app.post("/v1/auth/signup/", None, signup.clone()).await;
    let first = code_from_mail(&app, "fay@example.com");
    let (status, _) = app
        .post("/v1/auth/token/", None, json!({"username": "fay", "confirmation_code": first}))
        .await;
    assert_eq!(status, StatusCode::OK);

    // A confirmed user can ask for a new code and log in again
    app.post("/v1/auth/signup/", None, signup).await;
    let second = code_from_mail(&app, "fay@example.com");
    let (status, _) = app
        .post("/v1/auth/token/", None, json!({"username": "fay", "confirmation_code": first}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post("/v1/auth/token/", None, json!({"username": "fay", "confirmation_code": second}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bad_bearer_token() {
    let app = common::spawn().await;
    let admin = app.admin().await;
    app.seed_taxonomy(&admin).await;
    let title = app.title(&admin, "Hamlet", 1601).await;
    let (_, reader) = app.user("reader", Role::User).await;
    let (_, review) = app
        .post(
            &format!("/v1/titles/{}/reviews/", title),
            Some(&reader),
            json!({"text": "Long", "score": 8}),
        )
        .await;
    let review_uri = format!("/v1/titles/{}/reviews/{}/", title, review["id"]);
    let (_, comment) = app
        .post(&format!("{}comments/", review_uri), Some(&reader), json!({"text": "Very"}))
        .await;

    let public = [
        "/v1/categories/".to_string(),
        "/v1/genres/".to_string(),
        "/v1/titles/".to_string(),
        format!("/v1/titles/{}/", title),
        format!("/v1/titles/{}/reviews/", title),
        review_uri.clone(),
        format!("{}comments/", review_uri),
        format!("{}comments/{}/", review_uri, comment["id"]),
    ];
    for uri in &public {
        let (status, body) = app.get(uri, Some("not.a.token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["error"]["code"], "INVALID_TOKEN");

        // No header at all is simply anonymous
        let (status, _) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = common::spawn().await;

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"]["status"], "up");
}
