//! Authentication Tests
//!
//! Covers sign-up, sign-in, token rotation, sign-out, and the session check.

mod common;

use axum::http::StatusCode;
use common::{app, unique, DEFAULT_PASSWORD};
use serde_json::json;

// ===========================================================================
// Sign-up
// ===========================================================================

#[tokio::test]
async fn signup_creates_profile_and_tokens() {
    let app = app().await;
    let username = unique("signup");
    let email = format!("{}@example.com", username);

    let resp = app
        .post_json(
            "/v1/auth/signup",
            json!({ "email": email, "password": DEFAULT_PASSWORD, "username": username }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["profile"]["username"].as_str().unwrap(), username);

    let token = body["access_token"].as_str().unwrap();
    let session = app.get("/v1/auth/session", Some(token)).await;
    assert_eq!(session.status, StatusCode::OK);
    assert_eq!(session.json()["user"]["id"], body["profile"]["id"]);
}

#[tokio::test]
async fn signup_without_username_is_anonymous() {
    let app = app().await;
    let email = format!("{}@example.com", unique("signup_anon"));

    let resp = app
        .post_json(
            "/v1/auth/signup",
            json!({ "email": email, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert!(body["profile"]["username"].is_null());

    let token = body["access_token"].as_str().unwrap().to_string();
    let post = app
        .post_json("/v1/posts", json!({ "content": "nameless" }), Some(&token))
        .await;
    assert_eq!(post.json()["author_name"], "Anonymous");
}

#[tokio::test]
async fn signup_duplicate_email_conflicts() {
    let app = app().await;
    let user = app.create_user("signup_dup_email").await;

    let resp = app
        .post_json(
            "/v1/auth/signup",
            json!({ "email": user.email, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "email is already registered");
}

#[tokio::test]
async fn signup_duplicate_username_conflicts() {
    let app = app().await;
    let user = app.create_user("signup_dup_name").await;

    let resp = app
        .post_json(
            "/v1/auth/signup",
            json!({
                "email": format!("{}@example.com", unique("fresh")),
                "password": DEFAULT_PASSWORD,
                "username": user.username,
            }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "username is already taken");
}

#[tokio::test]
async fn signup_short_password_rejected() {
    let app = app().await;

    let resp = app
        .post_json(
            "/v1/auth/signup",
            json!({ "email": format!("{}@example.com", unique("short")), "password": "abc" }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signup_invalid_email_rejected() {
    let app = app().await;

    let resp = app
        .post_json(
            "/v1/auth/signup",
            json!({ "email": "not-an-email", "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Sign-in
// ===========================================================================

#[tokio::test]
async fn login_valid_credentials() {
    let app = app().await;
    let user = app.create_user("login_valid").await;

    let resp = app
        .post_json(
            "/v1/auth/login",
            json!({ "email": user.email, "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert!(body["access_expires_at"].is_string());
    assert!(body["refresh_expires_at"].is_string());
}

#[tokio::test]
async fn login_email_is_case_insensitive() {
    let app = app().await;
    let user = app.create_user("login_case").await;

    let resp = app
        .post_json(
            "/v1/auth/login",
            json!({ "email": user.email.to_uppercase(), "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn login_invalid_password() {
    let app = app().await;
    let user = app.create_user("login_badpw").await;

    let resp = app
        .post_json(
            "/v1/auth/login",
            json!({ "email": user.email, "password": "wrong_password" }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid credentials");
}

#[tokio::test]
async fn login_nonexistent_user() {
    let app = app().await;

    let resp = app
        .post_json(
            "/v1/auth/login",
            json!({ "email": "nobody@example.com", "password": DEFAULT_PASSWORD }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid credentials");
}

#[tokio::test]
async fn login_empty_fields() {
    let app = app().await;

    let resp = app
        .post_json("/v1/auth/login", json!({ "email": "", "password": "" }), None)
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Token lifecycle
// ===========================================================================

#[tokio::test]
async fn refresh_rotates_token() {
    let app = app().await;
    let user = app.create_user("refresh_rotate").await;

    let resp = app
        .post_json(
            "/v1/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let new_refresh = resp.json()["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, user.refresh_token);

    // The old refresh token is spent.
    let resp = app
        .post_json(
            "/v1/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_refresh_token() {
    let app = app().await;
    let user = app.create_user("logout").await;

    let resp = app
        .post_json(
            "/v1/auth/logout",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .post_json(
            "/v1/auth/refresh",
            json!({ "refresh_token": user.refresh_token }),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let app = app().await;
    let user = app.create_user("refresh_as_access").await;

    let resp = app
        .post_json(
            "/v1/posts",
            json!({ "content": "sneaky" }),
            Some(&user.refresh_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

// ===========================================================================
// Session
// ===========================================================================

#[tokio::test]
async fn session_anonymous_is_null() {
    let app = app().await;

    let resp = app.get("/v1/auth/session", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json()["user"].is_null());
}

#[tokio::test]
async fn session_with_garbage_token_is_null() {
    let app = app().await;

    let resp = app.get("/v1/auth/session", Some("not-a-token")).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json()["user"].is_null());
}

#[tokio::test]
async fn session_carries_profile() {
    let app = app().await;
    let user = app.create_user("session_profile").await;

    let resp = app.get("/v1/auth/session", Some(&user.access_token)).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["user"]["id"].as_str().unwrap(), user.id.to_string());
    assert_eq!(
        body["user"]["profile"]["username"].as_str().unwrap(),
        user.username
    );
}
