mod common;

use common::{TestApp, TestResponse};
use http::{Method, StatusCode};
use serde_json::json;
use store_server::Config;

fn signup(email: &str) -> serde_json::Value {
    json!({
        "email": email,
        "password": "password123",
        "first_name": "Amina",
        "last_name": "Otieno",
        "phone": "+254711000000",
    })
}

#[tokio::test]
async fn test_register_creates_user_and_profile() {
    let app = TestApp::new().await;

    let res = app.post("/api/auth/register", None, signup("Amina@Example.com")).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["token_type"], "Bearer");
    assert_eq!(res.body["user"]["email"], "amina@example.com");
    assert_eq!(res.body["user"]["is_staff"], false);

    let token = res.body["access_token"].as_str().unwrap().to_string();
    let me = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["customer"]["first_name"], "Amina");
    assert_eq!(me.body["customer"]["email"], "amina@example.com");
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::new().await;
    app.post("/api/auth/register", None, signup("dup@example.com")).await;

    let res = app.post("/api/auth/register", None, signup("DUP@example.com")).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validates_payload() {
    let app = TestApp::new().await;
    let res = app
        .post(
            "/api/auth/register",
            None,
            json!({"email": "nope", "password": "short", "first_name": "A", "last_name": "B"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["details"]["email"].is_array());
    assert!(res.body["details"]["password"].is_array());
}

#[tokio::test]
async fn test_register_cannot_take_over_staff_created_profile() {
    let app = TestApp::new().await;
    let staff = app.staff().await;
    let created = app
        .post(
            "/api/customers",
            Some(&staff),
            json!({"first_name": "Walk", "last_name": "In", "email": "walkin@example.com"}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["id"].as_i64().unwrap();

    let res = app.post("/api/auth/register", None, signup("WalkIn@example.com")).await;
    assert_eq!(res.status, StatusCode::CONFLICT, "{}", res.body);
    assert_eq!(res.body["code"], 3002);

    // no account was left behind and the profile is still unowned
    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "walkin@example.com", "password": "password123"}),
        )
        .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
    let profile = app.get(&format!("/api/customers/{id}"), Some(&staff)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert!(profile.body["user_id"].is_null());
}

#[tokio::test]
async fn test_login_and_refresh() {
    let app = TestApp::new().await;
    app.post("/api/auth/register", None, signup("login@example.com")).await;

    let bad = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "login@example.com", "password": "wrong-password"}),
        )
        .await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);

    let ok = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "LOGIN@example.com", "password": "password123"}),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK, "{}", ok.body);
    assert!(ok.body["user"]["last_login_at"].is_i64());

    let access = ok.body["access_token"].as_str().unwrap().to_string();
    let refresh = ok.body["refresh_token"].as_str().unwrap().to_string();

    // An access token is not accepted as a refresh token
    let wrong_kind = app
        .post("/api/auth/refresh", None, json!({ "refresh_token": access }))
        .await;
    assert_eq!(wrong_kind.status, StatusCode::UNAUTHORIZED);

    let renewed = app
        .post("/api/auth/refresh", None, json!({ "refresh_token": refresh.clone() }))
        .await;
    assert_eq!(renewed.status, StatusCode::OK);
    assert!(renewed.body["access_token"].is_string());

    // ...and a refresh token does not open protected routes
    let me = app.get("/api/auth/me", Some(&refresh)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_disabled_account_cannot_sign_in() {
    let app = TestApp::new().await;
    let res = app.post("/api/auth/register", None, signup("gone@example.com")).await;
    let user_id = res.body["user"]["id"].as_i64().unwrap();
    let refresh = res.body["refresh_token"].as_str().unwrap().to_string();
    let access = res.body["access_token"].as_str().unwrap().to_string();

    store_server::db::users::set_active(&app.state.pool, user_id, false)
        .await
        .unwrap();

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "gone@example.com", "password": "password123"}),
        )
        .await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
    assert_eq!(login.body["code"], 1007);

    let renewed = app
        .post("/api/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(renewed.status, StatusCode::UNAUTHORIZED);

    // tokens issued before the account was disabled stop working at once
    let me = app.get("/api/auth/me", Some(&access)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    assert_eq!(me.body["code"], 1007);
    let orders = app.get("/api/orders", Some(&access)).await;
    assert_eq!(orders.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_demoted_staff_loses_staff_routes() {
    let app = TestApp::new().await;
    let staff = app.staff().await;
    assert_eq!(app.get("/api/customers", Some(&staff)).await.status, StatusCode::OK);

    sqlx::query("UPDATE users SET is_staff = 0 WHERE email = 'staff@anthonystore.local'")
        .execute(&app.state.pool)
        .await
        .unwrap();

    let res = app.get("/api/customers", Some(&staff)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let me = app.get("/api/auth/me", Some(&staff)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["is_staff"], false);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new().await;

    let res = app.get("/api/auth/me", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.get("/api/auth/me", Some("not-a-jwt")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new().await;
    let token = app.user("change@example.com", false).await;

    let wrong = app
        .post(
            "/api/auth/change-password",
            Some(&token),
            json!({"current_password": "nope", "new_password": "brand-new-pass"}),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);

    let ok = app
        .post(
            "/api/auth/change-password",
            Some(&token),
            json!({"current_password": "password123", "new_password": "brand-new-pass"}),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "change@example.com", "password": "brand-new-pass"}),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_rate_limited() {
    let app = TestApp::new().await;
    let attempt = json!({"email": "ghost@example.com", "password": "whatever1"});

    for _ in 0..5 {
        let res = app.post("/api/auth/login", None, attempt.clone()).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }
    let res = app.post("/api/auth/login", None, attempt).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
}

/// Failed login attempt arriving with an `X-Forwarded-For` header
async fn login_via(app: &TestApp, forwarded: &str) -> TestResponse {
    app.request_with_headers(
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "ghost@example.com", "password": "whatever1"})),
        &[("x-forwarded-for", forwarded)],
    )
    .await
}

#[tokio::test]
async fn test_forwarded_for_cannot_dodge_rate_limit() {
    let app = TestApp::new().await;
    for n in 0..5 {
        let res = login_via(&app, &format!("10.0.0.{n}")).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }
    let res = login_via(&app, "10.0.0.99").await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_trusted_proxy_limits_per_forwarded_client() {
    let app = TestApp::with_config(Config {
        trust_proxy: true,
        ..Config::in_memory()
    })
    .await;

    for _ in 0..5 {
        assert_eq!(login_via(&app, "198.51.100.1").await.status, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(
        login_via(&app, "198.51.100.1").await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(login_via(&app, "198.51.100.2").await.status, StatusCode::UNAUTHORIZED);
}
