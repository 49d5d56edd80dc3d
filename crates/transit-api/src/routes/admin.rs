//! Token cache administration

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tracing::info;
use transit_auth::{AuthUser, require_admin, require_token};

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{InvalidateTokenRequest, TokenCacheStatsResponse};

/// DELETE /admin/token-cache
async fn clear_token_cache(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Json<Value> {
    state.validator.clear_cache();
    info!("Token cache cleared by {}", user.identity.email);

    Json(json!({ "message": "Token cache cleared" }))
}

/// POST /admin/token-cache/invalidate
async fn invalidate_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<InvalidateTokenRequest>,
) -> Result<StatusCode, ApiError> {
    if request.token.trim().is_empty() {
        return Err(ApiError::BadRequest("Token cannot be empty".to_string()));
    }

    state.validator.delete_token_from_cache(&request.token);
    info!("Token removed from cache by {}", user.identity.email);

    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/token-cache/stats
async fn token_cache_stats(State(state): State<AppState>) -> Json<TokenCacheStatsResponse> {
    let cache = state.validator.cache();

    Json(TokenCacheStatsResponse {
        entries: cache.entry_count(),
        capacity: cache.capacity(),
        ttl_secs: cache.ttl().as_secs(),
    })
}

/// Create admin routes
///
/// Layers run bottom-up, so the token check sees the request before the
/// role check does.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/token-cache", delete(clear_token_cache))
        .route("/admin/token-cache/invalidate", post(invalidate_token))
        .route("/admin/token-cache/stats", get(token_cache_stats))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.validator.clone(), require_token))
}
