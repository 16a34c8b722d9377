use async_trait::async_trait;

use super::password::verify_password_blocking;
use super::service::Authenticator;
use super::{AuthError, Principal, DEFAULT_ROLE};
use crate::database::models::User;
use crate::database::UserRepository;

/// Authenticator over the `users` table with bcrypt password hashes
pub struct UserAuthenticator {
    users: UserRepository,
}

impl UserAuthenticator {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }
}

/// `ROLE_<name>` for the assigned role, `ROLE_USER` when there is none
pub fn principal_for(user: &User) -> Principal {
    let role = match &user.role {
        Some(role) if !role.name.is_empty() => format!("ROLE_{}", role.name),
        _ => DEFAULT_ROLE.to_string(),
    };
    Principal {
        username: user.username.clone(),
        roles: vec![role],
    }
}

#[async_trait]
impl Authenticator for UserAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let matches = match verify_password_blocking(password.to_string(), user.password.clone()).await {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Password check for '{}' could not run: {}", username, e);
                false
            }
        };
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(principal_for(&user))
    }

    async fn load_principal(&self, username: &str) -> Result<Option<Principal>, AuthError> {
        Ok(self.users.find_by_username(username).await?.as_ref().map(principal_for))
    }
}
