//! In-process cache of validated tokens
//!
//! Maps the raw token string to the identity it resolved to. Entries
//! expire a fixed time after insertion and, once the cache is full, the
//! least recently used entry is evicted. Lookups and writes never
//! suspend.
//!
//! The key is the token itself, not the subject: two tokens for the same
//! user occupy two slots, and invalidating a session means naming the
//! exact token.

use std::sync::Arc;
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tracing::{debug, info};
use transit_db::Identity;

/// Default maximum number of cached tokens.
pub const DEFAULT_MAX_ENTRIES: u64 = 1000;

/// Default time-to-live of a cached token.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Configuration for the token cache
#[derive(Debug, Clone)]
pub struct TokenCacheConfig {
    /// Maximum number of simultaneous entries
    pub max_entries: u64,
    /// Age after which an entry is treated as absent
    pub ttl: Duration,
}

impl Default for TokenCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: DEFAULT_TTL,
        }
    }
}

/// Token cache shared by all request handlers
pub struct TokenCache {
    entries: Cache<String, Arc<Identity>>,
    config: TokenCacheConfig,
}

impl TokenCache {
    /// Create a new token cache
    pub fn new(config: TokenCacheConfig) -> Self {
        info!(
            "Initializing token cache (max_entries: {}, ttl: {:?})",
            config.max_entries, config.ttl
        );

        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { entries, config }
    }

    /// Look up an unexpired entry
    pub fn get(&self, token: &str) -> Option<Arc<Identity>> {
        self.entries.get(token)
    }

    /// Store the identity a token resolved to, replacing any previous entry
    pub fn insert(&self, token: &str, identity: Arc<Identity>) {
        self.entries.insert(token.to_string(), identity);
    }

    /// Remove a single token; absent tokens are ignored
    pub fn invalidate(&self, token: &str) {
        debug!("Invalidating cached token");
        self.entries.invalidate(token);
    }

    /// Remove every entry
    pub fn clear(&self) {
        info!("Clearing token cache");
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    /// Number of live entries
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn capacity(&self) -> u64 {
        self.config.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(TokenCacheConfig::default())
    }
}
