//! Integration tests for `/api/v1/auth`.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, expect_json, get_auth, post_json};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: register then login returns a usable token
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_then_login() {
    let test = build_test_app();

    let response = post_json(
        test.app(),
        "/api/v1/auth/register",
        json!({ "username": "alice", "password": "wonderland", "email": "a@example.com" }),
    )
    .await;
    let json = expect_json(response, StatusCode::CREATED).await;
    assert_eq!(json["data"]["username"], "alice");
    assert_eq!(json["data"]["email"], "a@example.com");
    assert!(json["data"].get("password_hash").is_none());
    let user_id = json["data"]["id"].as_i64().unwrap();

    let response = post_json(
        test.app(),
        "/api/v1/auth/login",
        json!({ "username": "alice", "password": "wonderland" }),
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["data"]["token_type"], "Bearer");
    assert_eq!(json["data"]["user"]["id"], user_id);
    assert_eq!(json["data"]["expires_in"], 3600);

    let token = json["data"]["access_token"].as_str().unwrap();
    let response = get_auth(test.app(), "/api/v1/relations/friends", token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: wrong password and unknown user look the same
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let test = build_test_app();
    post_json(
        test.app(),
        "/api/v1/auth/register",
        json!({ "username": "bob", "password": "builder1" }),
    )
    .await;

    let wrong_password = post_json(
        test.app(),
        "/api/v1/auth/login",
        json!({ "username": "bob", "password": "not-it" }),
    )
    .await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let a = body_json(wrong_password).await;

    let unknown_user = post_json(
        test.app(),
        "/api/v1/auth/login",
        json!({ "username": "nobody", "password": "builder1" }),
    )
    .await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let b = body_json(unknown_user).await;

    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Test: duplicate usernames are a conflict
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_username_is_conflict() {
    let test = build_test_app();
    let body = json!({ "username": "carol", "password": "secret1" });

    let first = post_json(test.app(), "/api/v1/auth/register", body.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = post_json(test.app(), "/api/v1/auth/register", body).await;
    let json = expect_json(second, StatusCode::CONFLICT).await;
    assert_eq!(json["code"], "CONFLICT");
}

// ---------------------------------------------------------------------------
// Test: registration input validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn registration_validates_input() {
    let test = build_test_app();

    let short_password = post_json(
        test.app(),
        "/api/v1/auth/register",
        json!({ "username": "dave", "password": "12345" }),
    )
    .await;
    let json = expect_json(short_password, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let long_name = post_json(
        test.app(),
        "/api/v1/auth/register",
        json!({ "username": "x".repeat(21), "password": "123456" }),
    )
    .await;
    assert_eq!(long_name.status(), StatusCode::BAD_REQUEST);

    let blank_name = post_json(
        test.app(),
        "/api/v1/auth/register",
        json!({ "username": "  ", "password": "123456" }),
    )
    .await;
    assert_eq!(blank_name.status(), StatusCode::BAD_REQUEST);
}
