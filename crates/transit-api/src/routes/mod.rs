//! API routes

mod admin;
pub mod system;
pub mod types;
mod users;

use axum::{Router, http::Uri};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::{AppState, MetricsHandle};

/// Fallback for unmatched routes
async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route not found: {}", uri.path()))
}

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        .merge(system::health_routes())
        .merge(users::routes(&state))
        .merge(admin::routes(&state))
        .with_state(state);

    if let Some(handle) = metrics_handle {
        router = router.merge(system::metrics_routes(handle));
    }

    router.fallback(not_found)
}
