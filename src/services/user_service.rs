use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::resilience::CircuitBreaker;
use super::role_service::RoleResponse;
use super::{contains_pattern, read_guarded, FieldErrors, ServiceError};
use crate::audit::{ActorResolver, Audited, Clock};
use crate::auth::password::hash_password_blocking;
use crate::database::models::User;
use crate::database::{CrudRepository, RoleRepository, UserRepository};
use crate::filter::{FilterMap, Page, PageRequest};

#[derive(Debug, Clone, Deserialize)]
pub struct UserRequest {
    pub username: String,
    pub password: String,
    pub role_id: Option<i64>,
}

impl UserRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::default();
        let username = self.username.trim();
        errors.check(!username.is_empty(), "username", "Username is mandatory");
        errors.check(
            (2..=100).contains(&username.chars().count()),
            "username",
            "Username must be between 2 and 100 characters",
        );
        errors.check(!self.password.is_empty(), "password", "Password is mandatory");
        // bcrypt only reads the first 72 bytes
        errors.check(self.password.len() <= 72, "password", "Password must be at most 72 bytes");
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub username: Option<String>,
    pub role: Option<i64>,
}

impl UserFilter {
    fn to_filter_map(&self) -> FilterMap {
        let mut filters = FilterMap::new();
        if let Some(username) = self.username.as_deref().filter(|u| !u.trim().is_empty()) {
            filters.insert("username", contains_pattern(username));
        }
        if let Some(role) = self.role {
            filters.insert("role", role);
        }
        filters
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResponse {
    pub id: Option<i64>,
    pub username: String,
    pub role: Option<RoleResponse>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role.map(RoleResponse::from),
            created_at: user.audit.created_at,
            created_by: user.audit.created_by,
            updated_at: user.audit.updated_at,
            updated_by: user.audit.updated_by,
        }
    }
}

pub struct UserService {
    users: UserRepository,
    roles: RoleRepository,
    clock: Arc<dyn Clock>,
    breaker: Option<CircuitBreaker>,
}

impl UserService {
    pub fn new(
        users: UserRepository,
        roles: RoleRepository,
        clock: Arc<dyn Clock>,
        breaker: Option<CircuitBreaker>,
    ) -> Self {
        Self { users, roles, clock, breaker }
    }

    async fn resolve_role(&self, role_id: Option<i64>) -> Result<Option<crate::database::models::Role>, ServiceError> {
        match role_id {
            None => Ok(None),
            Some(id) => self
                .roles
                .find_by_id(id)
                .await?
                .map(Some)
                .ok_or_else(|| ServiceError::NotFound(format!("Role not found with id: {}", id))),
        }
    }

    pub async fn create(&self, request: UserRequest, actor: &dyn ActorResolver) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let role = self.resolve_role(request.role_id).await?;
        let user = User {
            id: None,
            username: request.username.trim().to_string(),
            password: hash_password_blocking(request.password).await?,
            role,
            audit: Default::default(),
        };

        let saved = Audited::new(&self.users, actor, self.clock.as_ref()).save(user).await?;
        tracing::info!("Created user '{}' (id {:?})", saved.username, saved.id);
        Ok(saved.into())
    }

    pub async fn get(&self, id: i64) -> Result<UserResponse, ServiceError> {
        let read = async {
            let user = self.users.find_by_id(id).await?;
            user.map(UserResponse::from)
                .ok_or_else(|| ServiceError::NotFound(format!("User not found with id: {}", id)))
        };
        read_guarded(self.breaker.as_ref(), "users.get", read)
            .await?
            .ok_or_else(|| ServiceError::Unavailable("User service temporarily unavailable".to_string()))
    }

    pub async fn list(&self, request: &PageRequest, filter: &UserFilter) -> Result<Page<UserResponse>, ServiceError> {
        let filters = filter.to_filter_map();
        let read = async {
            let page = self.users.find_all_paged(request, &filters).await?;
            Ok::<_, ServiceError>(page.map(UserResponse::from))
        };
        Ok(read_guarded(self.breaker.as_ref(), "users.list", read)
            .await?
            .unwrap_or_else(|| Page::empty(request)))
    }

    pub async fn update(
        &self,
        id: i64,
        request: UserRequest,
        actor: &dyn ActorResolver,
    ) -> Result<UserResponse, ServiceError> {
        request.validate()?;
        let mut user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User not found with id: {}", id)))?;

        user.role = self.resolve_role(request.role_id).await?;
        user.username = request.username.trim().to_string();
        user.password = hash_password_blocking(request.password).await?;

        let affected = Audited::new(&self.users, actor, self.clock.as_ref()).update(&mut user).await?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("User not found with id: {}", id)));
        }
        Ok(user.into())
    }

    /// `false` when there was nothing to delete
    pub async fn delete(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.users.delete_by_id(id).await? > 0)
    }
}
