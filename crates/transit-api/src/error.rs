//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::google::GoogleError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] transit_db::DbError),

    #[error("Auth error: {0}")]
    Auth(#[from] transit_auth::AuthError),

    #[error("Google sign-in error: {0}")]
    Google(#[from] GoogleError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // Auth errors own their response shape (including the bare 403)
            ApiError::Auth(e) => return e.into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                internal()
            }
            ApiError::Database(e) => match e {
                transit_db::DbError::Duplicate(msg) => (StatusCode::BAD_REQUEST, msg),
                other => {
                    error!("Database error: {}", other);
                    internal()
                }
            },
            ApiError::Google(e) => match e {
                GoogleError::Rejected(_) | GoogleError::MissingEmail => {
                    (StatusCode::UNAUTHORIZED, "Invalid Google token".to_string())
                }
                other => {
                    error!("Google sign-in failed: {}", other);
                    internal()
                }
            },
        };

        let body = axum::Json(json!({
            "message": message
        }));

        (status, body).into_response()
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}
