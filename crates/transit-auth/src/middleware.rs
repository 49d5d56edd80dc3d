//! Authentication middleware for Axum

use axum::{
    extract::{RawPathParams, Request, State, rejection::RawPathParamsRejection},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};
use transit_db::Identity;

use crate::credential::{TOKEN_PARAM, extract_credential, request_timezone};
use crate::error::AuthError;
use crate::validator::{CacheStatus, TokenValidator};

/// Response header reporting whether the token cache served the request
pub const CACHE_STATUS_HEADER: &str = "x-cache";
/// Response header reporting validation latency
pub const RESPONSE_TIME_HEADER: &str = "x-response-time";

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Arc<Identity>,
    pub cache_status: CacheStatus,
}

/// Token validation middleware
///
/// Extracts the credential, validates it through the [`TokenValidator`]
/// and adds an [`AuthUser`] (and a `RequestTimezone` when the caller sent
/// a known zone) to request extensions. Successful responses carry the
/// `X-Cache` and `X-Response-Time` headers.
pub async fn require_token(
    State(validator): State<Arc<TokenValidator>>,
    path_params: Result<RawPathParams, RawPathParamsRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let route_token = path_params.ok().and_then(|params| {
        params
            .iter()
            .find(|(name, _)| *name == TOKEN_PARAM)
            .map(|(_, value)| value.to_string())
    });

    if let Some(timezone) = request_timezone(request.headers()) {
        request.extensions_mut().insert(timezone);
    }

    let Some(credential) = extract_credential(
        request.headers(),
        request.uri().query(),
        route_token.as_deref(),
    ) else {
        return reject(AuthError::MissingCredential);
    };

    let validated = match validator.validate(&credential).await {
        Ok(validated) => validated,
        Err(e) => return reject(e),
    };

    let elapsed = start.elapsed();
    metrics::histogram!("transit_token_validation_seconds").record(elapsed.as_secs_f64());

    debug!(
        "Authenticated user: {} ({})",
        validated.identity.email,
        validated.status.as_str()
    );

    let status = validated.status;
    request.extensions_mut().insert(AuthUser {
        identity: validated.identity,
        cache_status: status,
    });

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status.as_str()));
    if let Ok(value) = HeaderValue::from_str(&format_millis(elapsed.as_secs_f64() * 1000.0)) {
        headers.insert(RESPONSE_TIME_HEADER, value);
    }

    response
}

/// Middleware to require the admin role
///
/// Must be layered inside [`require_token`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingCredential)?;

    if !user.identity.is_admin() {
        debug!("Admin access refused for user: {}", user.identity.email);
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

fn reject(err: AuthError) -> Response {
    if err.is_system_error() {
        error!("Token validation failed: {}", err);
    } else {
        debug!("Token rejected: {}", err);
    }
    metrics::counter!("transit_token_rejections_total", "reason" => err.reason()).increment(1);
    err.into_response()
}

fn format_millis(ms: f64) -> String {
    format!("{:.2}ms", ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0.0), "0.00ms");
        assert_eq!(format_millis(1.23456), "1.23ms");
        assert_eq!(format_millis(250.0), "250.00ms");
    }
}
