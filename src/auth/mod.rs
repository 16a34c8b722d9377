pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod service;
pub mod token_store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use authenticator::UserAuthenticator;
pub use jwt::TokenService;
pub use service::{AuthService, Authenticator, TokenPair};
pub use token_store::{InMemoryTokenStore, RefreshTokenStore};

/// Role granted when a user has no role assigned
pub const DEFAULT_ROLE: &str = "ROLE_USER";

pub const ADMIN_ROLE: &str = "ROLE_ADMIN";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Invalid access token: {0}")]
    InvalidAccessToken(String),

    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("Token generation error: {0}")]
    TokenGeneration(String),

    #[error("Database error: {0}")]
    Database(#[from] crate::database::DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Access token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token, so two tokens minted in the same second still differ
    pub jti: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Authenticated identity with its granted authorities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
