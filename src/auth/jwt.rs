//! Access token signing and refresh token issuance.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::token_store::{InMemoryTokenStore, RefreshTokenStore};
use super::{AuthError, Claims};
use crate::config::SecurityConfig;

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    store: Arc<dyn RefreshTokenStore>,
}

impl TokenService {
    pub fn new(
        secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
        store: Arc<dyn RefreshTokenStore>,
    ) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
            store,
        })
    }

    /// HS256 signer with an in-memory refresh token store sized from configuration
    pub fn from_config(security: &SecurityConfig) -> Result<Self, AuthError> {
        Self::new(
            &security.jwt_secret,
            Duration::from_secs(security.access_token_ttl_secs),
            Duration::from_secs(security.refresh_token_ttl_secs),
            Arc::new(InMemoryTokenStore::new(security.refresh_token_cache_max_entries)),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn issue_access_token(&self, username: &str, roles: &[String]) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp: now + self.access_ttl.as_secs() as i64,
            jti: Uuid::new_v4().to_string(),
            roles: roles.to_vec(),
        };
        self.sign(&claims)
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Decode and check signature and expiry
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidAccessToken(e.to_string()))
    }

    /// Random opaque token, stored as `token -> username` for the refresh TTL
    pub async fn issue_refresh_token(&self, username: &str) -> Result<String, AuthError> {
        let token = Uuid::new_v4().to_string();
        self.store.put(&token, username, self.refresh_ttl).await?;
        Ok(token)
    }

    pub async fn revoke_refresh_token(&self, token: &str) -> Result<(), AuthError> {
        self.store.evict(token).await
    }

    pub async fn resolve_username(&self, token: &str) -> Result<Option<String>, AuthError> {
        self.store.get(token).await
    }

    /// Resolve and revoke in one atomic step
    pub async fn consume_refresh_token(&self, token: &str) -> Result<Option<String>, AuthError> {
        self.store.take(token).await
    }
}
