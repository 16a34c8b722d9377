use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::jwt::TokenService;
use super::{AuthError, Principal};

/// Credential check and principal lookup, backed by the user store
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Fails with `InvalidCredentials` on an unknown user or wrong password
    async fn authenticate(&self, username: &str, password: &str) -> Result<Principal, AuthError>;

    async fn load_principal(&self, username: &str) -> Result<Option<Principal>, AuthError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Login, refresh-token rotation and logout
pub struct AuthService {
    tokens: Arc<TokenService>,
    authenticator: Arc<dyn Authenticator>,
}

impl AuthService {
    pub fn new(tokens: Arc<TokenService>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self { tokens, authenticator }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        debug!("Login attempt for '{}'", username);
        let principal = self.authenticator.authenticate(username, password).await?;
        let pair = self.issue_pair(&principal).await?;
        info!("User '{}' logged in", principal.username);
        Ok(pair)
    }

    /// Single-use rotation: the presented token is consumed before a new pair is issued.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let username = self
            .tokens
            .resolve_username(refresh_token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let principal = self
            .authenticator
            .load_principal(&username)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        // Racing refreshes on one token: only the caller that removes it proceeds.
        match self.tokens.consume_refresh_token(refresh_token).await? {
            Some(owner) if owner == username => {}
            _ => return Err(AuthError::InvalidRefreshToken),
        }

        let pair = self.issue_pair(&principal).await?;
        info!("Rotated refresh token for '{}'", principal.username);
        Ok(pair)
    }

    /// Idempotent
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.tokens.revoke_refresh_token(refresh_token).await?;
        info!("Refresh token revoked");
        Ok(())
    }

    async fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        let access_token = self.tokens.issue_access_token(&principal.username, &principal.roles)?;
        let refresh_token = self.tokens.issue_refresh_token(&principal.username).await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.access_ttl().as_secs(),
        })
    }
}
