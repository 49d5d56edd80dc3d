//! Authentication error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use transit_db::DbError;

/// Message returned for a credential that failed verification
pub const INVALID_SESSION_MESSAGE: &str = "Your session has expired or the token is invalid";

/// Message returned for any failure on the server side of validation
pub const VALIDATION_FAILURE_MESSAGE: &str = "Internal server error while validating session";

/// Failure reported by an identity store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Identity store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No credential presented")]
    MissingCredential,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Identity not found for subject {0}")]
    IdentityNotFound(String),

    #[error("Identity store error: {0}")]
    Store(#[from] StoreError),

    #[error("Token verification failed: {0}")]
    Verification(String),

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Inactive user")]
    InactiveUser,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    /// Whether this error is a server-side failure rather than a rejected client
    pub fn is_system_error(&self) -> bool {
        matches!(
            self,
            AuthError::IdentityNotFound(_)
                | AuthError::Store(_)
                | AuthError::Verification(_)
                | AuthError::TokenSigning(_)
                | AuthError::PasswordHash(_)
        )
    }

    /// Short label used for rejection metrics
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::IdentityNotFound(_) => "identity_not_found",
            AuthError::Store(_) => "store_failure",
            AuthError::Verification(_) => "verification_failure",
            AuthError::TokenSigning(_) => "signing_failure",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InactiveUser => "inactive_user",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::PasswordHash(_) => "password_hash",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // Bare 403: nothing was presented, so there is nothing to explain
            AuthError::MissingCredential => return StatusCode::FORBIDDEN.into_response(),
            AuthError::InvalidToken | AuthError::TokenExpired => {
                (StatusCode::FORBIDDEN, INVALID_SESSION_MESSAGE)
            }
            AuthError::IdentityNotFound(_) | AuthError::Store(_) | AuthError::Verification(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, VALIDATION_FAILURE_MESSAGE)
            }
            AuthError::TokenSigning(_) | AuthError::PasswordHash(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::InactiveUser => (StatusCode::UNAUTHORIZED, "Inactive user"),
            AuthError::InsufficientPermissions => {
                (StatusCode::FORBIDDEN, "Insufficient permissions")
            }
        };

        let body = axum::Json(json!({
            "message": message
        }));

        (status, body).into_response()
    }
}
