use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::AuthError;

/// Key-value store with per-entry expiry holding `refresh token -> username`
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn put(&self, token: &str, username: &str, ttl: Duration) -> Result<(), AuthError>;

    async fn get(&self, token: &str) -> Result<Option<String>, AuthError>;

    /// Evicting an absent token is not an error.
    async fn evict(&self, token: &str) -> Result<(), AuthError>;

    /// Atomically remove and return the mapping. Of several concurrent callers
    /// presenting the same token, at most one receives `Some`.
    async fn take(&self, token: &str) -> Result<Option<String>, AuthError>;
}

struct Entry {
    username: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Bounded in-process store
pub struct InMemoryTokenStore {
    entries: DashMap<String, Entry>,
    max_entries: usize,
}

impl InMemoryTokenStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries.retain(|_, e| e.is_live(now));
    }

    fn make_room(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        self.cleanup();
        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().expires_at)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryTokenStore {
    async fn put(&self, token: &str, username: &str, ttl: Duration) -> Result<(), AuthError> {
        self.make_room();
        self.entries.insert(
            token.to_string(),
            Entry {
                username: username.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<String>, AuthError> {
        let now = Instant::now();
        let live = self
            .entries
            .get(token)
            .map(|e| e.is_live(now).then(|| e.username.clone()));
        match live {
            Some(Some(username)) => Ok(Some(username)),
            Some(None) => {
                self.entries.remove_if(token, |_, e| !e.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn evict(&self, token: &str) -> Result<(), AuthError> {
        self.entries.remove(token);
        Ok(())
    }

    async fn take(&self, token: &str) -> Result<Option<String>, AuthError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(token)
            .filter(|(_, e)| e.is_live(now))
            .map(|(_, e)| e.username))
    }
}
