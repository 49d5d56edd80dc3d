//! Identity lookup used on a token cache miss

use async_trait::async_trait;
use transit_db::{Database, Identity};

use crate::error::StoreError;

/// Source of live identity records
///
/// Implementations must read current state: the validator only calls
/// this after the cache has already missed.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fetch the identity for a user ID, `None` if no such user exists
    async fn find_identity(&self, user_id: &str) -> Result<Option<Identity>, StoreError>;
}

#[async_trait]
impl IdentityStore for Database {
    async fn find_identity(&self, user_id: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.get_identity(user_id).await?)
    }
}
