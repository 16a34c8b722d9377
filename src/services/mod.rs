pub mod resilience;
pub mod role_service;
pub mod user_service;

use std::collections::HashMap;
use std::future::Future;
use thiserror::Error;

use crate::auth::{AuthError, Principal};
use crate::database::DatabaseError;
use resilience::{CallError, CircuitBreaker};

pub use resilience::{CircuitBreakerConfig, CircuitState};
pub use role_service::{RoleFilter, RoleRequest, RoleResponse, RoleService};
pub use user_service::{UserFilter, UserRequest, UserResponse, UserService};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("Validation failed")]
    Validation(HashMap<String, String>),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    /// Faults of the backing store, counted by the circuit breaker
    pub fn is_infrastructure(&self) -> bool {
        match self {
            ServiceError::Database(e) => e.is_infrastructure(),
            ServiceError::Auth(AuthError::Database(e)) => e.is_infrastructure(),
            _ => false,
        }
    }
}

pub fn require_role(principal: &Principal, role: &str) -> Result<(), ServiceError> {
    if principal.has_role(role) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!("{} required", role)))
    }
}

/// Collects field errors; empty means valid.
#[derive(Debug, Default)]
pub(crate) struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub(crate) fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok && !self.0.contains_key(field) {
            self.0.insert(field.to_string(), message.to_string());
        }
    }

    pub(crate) fn into_result(self) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.0))
        }
    }
}

/// Wrap a text filter for substring matching
pub(crate) fn contains_pattern(value: &str) -> String {
    format!("%{}%", value)
}

/// Run a read through the breaker when one is configured.
///
/// `Ok(None)` means the caller should answer with its fallback: the breaker is
/// open or the store failed.
pub(crate) async fn read_guarded<T, F>(
    breaker: Option<&CircuitBreaker>,
    op: &str,
    fut: F,
) -> Result<Option<T>, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    let Some(breaker) = breaker else {
        return fut.await.map(Some);
    };
    match breaker.call(ServiceError::is_infrastructure, fut).await {
        Ok(v) => Ok(Some(v)),
        Err(CallError::Rejected) => {
            tracing::warn!("Circuit open, using fallback for '{}'", op);
            Ok(None)
        }
        Err(CallError::Failed(e)) if e.is_infrastructure() => {
            tracing::error!("'{}' failed, using fallback: {}", op, e);
            Ok(None)
        }
        Err(CallError::Failed(e)) => Err(e),
    }
}
