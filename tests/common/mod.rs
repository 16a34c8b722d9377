#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

use crud_api::app::{router, AppState};
use crud_api::auth::{AuthError, Authenticator, Principal};
use crud_api::config::AppConfig;
use crud_api::database::{DatabaseError, Row, SqlExecutor};
use crud_api::filter::SqlParams;

/// In-memory credential check: username -> (password, roles)
pub struct StaticUsers(HashMap<String, (String, Vec<String>)>);

impl StaticUsers {
    pub fn new(users: &[(&str, &str, &str)]) -> Self {
        Self(
            users
                .iter()
                .map(|(u, p, r)| (u.to_string(), (p.to_string(), vec![r.to_string()])))
                .collect(),
        )
    }

    fn principal(&self, username: &str) -> Option<Principal> {
        self.0.get(username).map(|(_, roles)| Principal {
            username: username.to_string(),
            roles: roles.clone(),
        })
    }
}

#[async_trait]
impl Authenticator for StaticUsers {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        match self.0.get(username) {
            Some((p, _)) if p == password => self.principal(username).ok_or(AuthError::InvalidCredentials),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn load_principal(&self, username: &str) -> Result<Option<Principal>, AuthError> {
        Ok(self.principal(username))
    }
}

/// Reachable database holding no rows
pub struct EmptyStore;

#[async_trait]
impl SqlExecutor for EmptyStore {
    async fn query_scalar(&self, sql: &str, _params: &SqlParams) -> Result<i64, DatabaseError> {
        Ok(if sql.contains("count(") { 0 } else { 1 })
    }

    async fn query_rows(&self, _sql: &str, _params: &SqlParams) -> Result<Vec<Row>, DatabaseError> {
        Ok(Vec::new())
    }

    async fn execute(&self, _sql: &str, _params: &SqlParams) -> Result<u64, DatabaseError> {
        Ok(0)
    }
}

/// Database that never answers
pub struct DownStore;

#[async_trait]
impl SqlExecutor for DownStore {
    async fn query_scalar(&self, _sql: &str, _params: &SqlParams) -> Result<i64, DatabaseError> {
        Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn query_rows(&self, _sql: &str, _params: &SqlParams) -> Result<Vec<Row>, DatabaseError> {
        Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn execute(&self, _sql: &str, _params: &SqlParams) -> Result<u64, DatabaseError> {
        Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = "integration-test-secret".to_string();
    config
}

pub fn app_with(executor: Arc<dyn SqlExecutor>) -> Result<Router> {
    let users = StaticUsers::new(&[
        ("alice", "wonderland", "ROLE_ADMIN"),
        ("bob", "builder", "ROLE_USER"),
    ]);
    let state = AppState::with_authenticator(Arc::new(test_config()), executor, Arc::new(users))?;
    Ok(router(state))
}

pub fn app() -> Result<Router> {
    app_with(Arc::new(EmptyStore))
}

pub async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

pub fn post_json(uri: &str, body: Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))?)
}

pub fn authorized(method: &str, uri: &str, token: &str, body: Option<Value>) -> Result<Request<Body>> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    Ok(match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    })
}

/// Log in and return `(access_token, refresh_token)`
pub async fn login(app: &Router, username: &str, password: &str) -> Result<(String, String)> {
    let (status, body) = send(
        app,
        post_json("/auth/login", serde_json::json!({ "username": username, "password": password }))?,
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
    let access = body["access_token"].as_str().unwrap_or_default().to_string();
    let refresh = body["refresh_token"].as_str().unwrap_or_default().to_string();
    Ok((access, refresh))
}
