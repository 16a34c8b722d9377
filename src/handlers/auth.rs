//! Public authentication endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::TokenPair;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `POST /auth/login` - exchange credentials for an access/refresh token pair.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }
    let pair = state.auth.login(body.username.trim(), &body.password).await?;
    Ok(Json(pair))
}

/// `POST /auth/refresh` - rotate a refresh token.
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state.auth.refresh(&body.refresh_token).await?;
    Ok(Json(pair))
}

/// `POST /auth/logout` - revoke a refresh token.
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.logout(&body.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}
