//! Token validation pipeline
//!
//! ```text
//! credential → token cache ── hit ──→ identity (HIT)
//!                  │
//!                 miss
//!                  ↓
//!            verify signature/expiry ── invalid/expired ──→ reject
//!                  ↓
//!            fetch live identity ── none/error ──→ internal error
//!                  ↓
//!            cache under raw credential → identity (MISS)
//! ```
//!
//! Concurrent misses on the same credential are not coalesced; each one
//! verifies and resolves independently and the last cache write wins.

use std::sync::Arc;

use tracing::debug;
use transit_db::Identity;

use crate::cache::TokenCache;
use crate::error::AuthError;
use crate::jwt::JwtManager;
use crate::store::IdentityStore;

/// Whether a validation was served from the token cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Successful validation result
#[derive(Debug, Clone)]
pub struct Validated {
    pub identity: Arc<Identity>,
    pub status: CacheStatus,
}

/// Verifies credentials and resolves them to identities
pub struct TokenValidator {
    jwt: Arc<JwtManager>,
    store: Arc<dyn IdentityStore>,
    cache: TokenCache,
}

impl TokenValidator {
    pub fn new(jwt: Arc<JwtManager>, store: Arc<dyn IdentityStore>, cache: TokenCache) -> Self {
        Self { jwt, store, cache }
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Validate a raw credential
    pub async fn validate(&self, credential: &str) -> Result<Validated, AuthError> {
        if let Some(identity) = self.cache.get(credential) {
            metrics::counter!("transit_token_cache_hits_total").increment(1);
            debug!("Token cache hit for user: {}", identity.id);
            return Ok(Validated {
                identity,
                status: CacheStatus::Hit,
            });
        }

        let claims = self.jwt.validate_token(credential)?;

        let identity = self
            .store
            .find_identity(&claims.sub)
            .await?
            .ok_or_else(|| AuthError::IdentityNotFound(claims.sub.clone()))?;
        let identity = Arc::new(identity);

        self.cache.insert(credential, identity.clone());

        metrics::counter!("transit_token_cache_misses_total").increment(1);
        debug!("Token cache miss, resolved user: {}", identity.id);

        Ok(Validated {
            identity,
            status: CacheStatus::Miss,
        })
    }

    /// Drop every cached validation
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop the cached validation for one credential, if present
    pub fn delete_token_from_cache(&self, credential: &str) {
        self.cache.invalidate(credential);
    }
}
