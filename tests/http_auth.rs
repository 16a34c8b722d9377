mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::sync::Arc;

use common::{app, app_with, authorized, login, post_json, send, DownStore};

#[tokio::test]
async fn login_refresh_rotation_scenario() -> Result<()> {
    let app = app()?;

    let (a1, r1) = login(&app, "alice", "wonderland").await?;

    let (status, body) = send(&app, post_json("/auth/refresh", json!({ "refresh_token": r1 }))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    let a2 = body["access_token"].as_str().unwrap().to_string();
    let r2 = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(a1, a2);
    assert_ne!(r1, r2);

    let (status, body) = send(&app, post_json("/auth/refresh", json!({ "refresh_token": r1 }))?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, post_json("/auth/refresh", json!({ "refresh_token": r2 }))?).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let app = app()?;
    let (status, body) = send(
        &app,
        post_json("/auth/login", json!({ "username": "alice", "password": "nope" }))?,
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn logout_is_idempotent() -> Result<()> {
    let app = app()?;
    let (_, refresh) = login(&app, "bob", "builder").await?;

    for _ in 0..2 {
        let (status, _) = send(&app, post_json("/auth/logout", json!({ "refresh_token": refresh }))?).await?;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let (status, _) = send(&app, post_json("/auth/logout", json!({ "refresh_token": "never-issued" }))?).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, post_json("/auth/refresh", json!({ "refresh_token": refresh }))?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() -> Result<()> {
    let app = app()?;

    let request = Request::builder().uri("/api/users").body(Body::empty())?;
    let (status, _) = send(&app, request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, authorized("GET", "/api/users", "not-a-jwt", None)?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn role_writes_need_admin() -> Result<()> {
    let app = app()?;
    let (bob, _) = login(&app, "bob", "builder").await?;
    let (alice, _) = login(&app, "alice", "wonderland").await?;

    let body = json!({ "name": "x", "description": null });

    let (status, _) = send(&app, authorized("POST", "/api/roles", &bob, Some(body.clone()))?).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admin passes the role check and reaches validation
    let (status, body) = send(&app, authorized("POST", "/api/roles", &alice, Some(body))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["field_errors"]["name"].is_string());

    let (status, _) = send(&app, authorized("DELETE", "/api/roles/1", &bob, None)?).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn list_uses_success_envelope() -> Result<()> {
    let app = app()?;
    let (token, _) = login(&app, "bob", "builder").await?;

    let (status, body) = send(
        &app,
        authorized("GET", "/api/users?page=0&size=5&sort=username,desc&unknown=1", &token, None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["content"], json!([]));
    assert_eq!(body["data"]["size"], 5);
    assert_eq!(body["data"]["total_elements"], 0);

    let (status, _) = send(&app, authorized("GET", "/api/users?role=abc", &token, None)?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, authorized("GET", "/api/users?page=-2", &token, None)?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn missing_records_are_not_found() -> Result<()> {
    let app = app()?;
    let (token, _) = login(&app, "alice", "wonderland").await?;

    let (status, _) = send(&app, authorized("GET", "/api/users/42", &token, None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, authorized("DELETE", "/api/roles/42", &token, None)?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let request = || Request::builder().uri("/health").body(Body::empty());

    let (status, body) = send(&app()?, request()?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");

    let (status, body) = send(&app_with(Arc::new(DownStore))?, request()?).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "DOWN");
    Ok(())
}
