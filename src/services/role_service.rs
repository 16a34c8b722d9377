use serde::{Deserialize, Serialize};

use super::resilience::CircuitBreaker;
use super::{contains_pattern, read_guarded, FieldErrors, ServiceError};
use crate::database::models::Role;
use crate::database::{CrudRepository, RoleRepository};
use crate::filter::{FilterMap, Page, PageRequest};

#[derive(Debug, Clone, Deserialize)]
pub struct RoleRequest {
    pub name: String,
    pub description: Option<String>,
}

impl RoleRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::default();
        let name = self.name.trim();
        errors.check(!name.is_empty(), "name", "Role name is mandatory");
        errors.check(
            (2..=100).contains(&name.chars().count()),
            "name",
            "Role name must be between 2 and 100 characters",
        );
        let description_len = self.description.as_deref().map_or(0, |d| d.chars().count());
        errors.check(description_len <= 255, "description", "Description must be at most 255 characters");
        errors.into_result()
    }

    fn apply(self, role: &mut Role) {
        role.name = self.name.trim().to_string();
        role.description = self.description;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleFilter {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl RoleFilter {
    fn to_filter_map(&self) -> FilterMap {
        let mut filters = FilterMap::new();
        for (column, value) in [("name", &self.name), ("description", &self.description)] {
            if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                filters.insert(column, contains_pattern(v));
            }
        }
        filters
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleResponse {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            name: role.name,
            description: role.description,
        }
    }
}

pub struct RoleService {
    roles: RoleRepository,
    breaker: Option<CircuitBreaker>,
}

impl RoleService {
    pub fn new(roles: RoleRepository, breaker: Option<CircuitBreaker>) -> Self {
        Self { roles, breaker }
    }

    pub async fn create(&self, request: RoleRequest) -> Result<RoleResponse, ServiceError> {
        request.validate()?;
        let mut role = Role::default();
        request.apply(&mut role);
        let saved = self.roles.save(role).await?;
        tracing::info!("Created role '{}' (id {:?})", saved.name, saved.id);
        Ok(saved.into())
    }

    pub async fn get(&self, id: i64) -> Result<RoleResponse, ServiceError> {
        let read = async {
            let role = self.roles.find_by_id(id).await?;
            role.map(RoleResponse::from)
                .ok_or_else(|| ServiceError::NotFound(format!("Role not found with id: {}", id)))
        };
        read_guarded(self.breaker.as_ref(), "roles.get", read)
            .await?
            .ok_or_else(|| ServiceError::Unavailable("Role service temporarily unavailable".to_string()))
    }

    pub async fn list(&self, request: &PageRequest, filter: &RoleFilter) -> Result<Page<RoleResponse>, ServiceError> {
        let filters = filter.to_filter_map();
        let read = async {
            let page = self.roles.find_all_paged(request, &filters).await?;
            Ok::<_, ServiceError>(page.map(RoleResponse::from))
        };
        Ok(read_guarded(self.breaker.as_ref(), "roles.list", read)
            .await?
            .unwrap_or_else(|| Page::empty(request)))
    }

    pub async fn update(&self, id: i64, request: RoleRequest) -> Result<RoleResponse, ServiceError> {
        request.validate()?;
        let mut role = self
            .roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Role not found with id: {}", id)))?;
        request.apply(&mut role);

        if self.roles.update(&mut role).await? == 0 {
            return Err(ServiceError::NotFound(format!("Role not found with id: {}", id)));
        }
        Ok(role.into())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.roles.delete_by_id(id).await? > 0)
    }
}
