use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::pagination::parse_list_query;
use crate::app::AppState;
use crate::error::ApiError;
use crate::filter::Page;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{UserFilter, UserRequest, UserResponse};

/// `GET /api/users?page&size&sort&username&role`
pub async fn list(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Page<UserResponse>> {
    let query = parse_list_query(pairs, &state.config.pagination)?;
    let filter = UserFilter {
        username: query.param("username").map(str::to_string),
        role: query.int_param("role")?,
    };
    let page = state.users.list(&query.page, &filter).await?;
    Ok(ApiResponse::success(page))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<UserResponse> {
    Ok(ApiResponse::success(state.users.get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UserRequest>,
) -> ApiResult<UserResponse> {
    let created = state.users.create(body, &user.actor()).await?;
    Ok(ApiResponse::created(created))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<UserRequest>,
) -> ApiResult<UserResponse> {
    let updated = state.users.update(id, body, &user.actor()).await?;
    Ok(ApiResponse::success(updated))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    if state.users.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("User not found with id: {}", id)))
    }
}
