use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use super::pagination::parse_list_query;
use crate::app::AppState;
use crate::auth::ADMIN_ROLE;
use crate::error::ApiError;
use crate::filter::Page;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{require_role, RoleFilter, RoleRequest, RoleResponse};

/// `GET /api/roles?page&size&sort&name&description`
pub async fn list(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Page<RoleResponse>> {
    let query = parse_list_query(pairs, &state.config.pagination)?;
    let filter = RoleFilter {
        name: query.param("name").map(str::to_string),
        description: query.param("description").map(str::to_string),
    };
    let page = state.roles.list(&query.page, &filter).await?;
    Ok(ApiResponse::success(page))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<RoleResponse> {
    Ok(ApiResponse::success(state.roles.get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RoleRequest>,
) -> ApiResult<RoleResponse> {
    require_role(&user.principal(), ADMIN_ROLE)?;
    Ok(ApiResponse::created(state.roles.create(body).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<RoleRequest>,
) -> ApiResult<RoleResponse> {
    require_role(&user.principal(), ADMIN_ROLE)?;
    Ok(ApiResponse::success(state.roles.update(id, body).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_role(&user.principal(), ADMIN_ROLE)?;
    if state.roles.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Role not found with id: {}", id)))
    }
}
