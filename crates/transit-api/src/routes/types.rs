//! Request/Response DTOs

use serde::{Deserialize, Serialize};
use transit_db::Identity;

// ==================== Session Types ====================

/// Registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Google sign-in request
#[derive(Deserialize)]
pub struct GoogleLoginRequest {
    /// ID token issued to the client by Google
    pub credential: String,
}

/// Issued session
#[derive(Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub token: String,
    pub expires_in: i64,
    pub user: Identity,
}

/// Session verification result
#[derive(Serialize)]
pub struct VerifyResponse {
    pub user: Identity,
    pub cache: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_time: Option<String>,
}

// ==================== Token Cache Types ====================

/// Request to drop one token from the cache
#[derive(Deserialize)]
pub struct InvalidateTokenRequest {
    pub token: String,
}

/// Token cache statistics
#[derive(Serialize)]
pub struct TokenCacheStatsResponse {
    pub entries: u64,
    pub capacity: u64,
    pub ttl_secs: u64,
}
