//! Transit Hub Authentication
//!
//! This crate provides JWT issuing and verification, password hashing,
//! and the token validation middleware that fronts every authenticated
//! route. Validated identities are held in an in-process cache keyed by
//! the raw token string.

pub mod cache;
pub mod credential;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod store;
pub mod validator;

pub use cache::{TokenCache, TokenCacheConfig};
pub use credential::{RequestTimezone, extract_credential, request_timezone};
pub use error::{AuthError, StoreError};
pub use jwt::{Claims, JwtManager};
pub use middleware::{AuthUser, require_admin, require_token};
pub use password::{hash_password, verify_password};
pub use store::IdentityStore;
pub use validator::{CacheStatus, TokenValidator, Validated};
