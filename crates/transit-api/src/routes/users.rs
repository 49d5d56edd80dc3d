//! Account session routes

use std::sync::LazyLock;

use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use chrono::Utc;
use transit_auth::{
    AuthError, AuthUser, RequestTimezone, extract_credential, hash_password, require_token,
    verify_password,
};
use transit_db::{AuthType, DEFAULT_ROLE, NewUser, User};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::google::GoogleError;
use crate::state::AppState;

use super::types::{
    GoogleLoginRequest, LoginRequest, RegisterRequest, SessionResponse, VerifyResponse,
};

// ==================== Input Validation ====================

/// Maximum allowed email length
const MAX_EMAIL_LENGTH: usize = 254;
/// Minimum allowed password length
const MIN_PASSWORD_LENGTH: usize = 6;
/// Maximum allowed password length (prevent DoS with very large passwords)
const MAX_PASSWORD_LENGTH: usize = 256;
/// Maximum allowed display name length
const MAX_NAME_LENGTH: usize = 128;

/// Hash checked when the account has no usable password, so unknown
/// emails cost the same as wrong passwords
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("timing-equalizer").ok());

fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Email exceeds maximum length of {} characters",
            MAX_EMAIL_LENGTH
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name cannot be empty".to_string()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Name exceeds maximum length of {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Sign a token for a stored user and bundle it with their identity
async fn issue_session(
    state: &AppState,
    user: &User,
    message: &str,
) -> Result<SessionResponse, ApiError> {
    let identity = state
        .db
        .get_identity(&user.id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("User {} missing after write", user.id)))?;

    let jwt = state.validator.jwt();
    let token = jwt.generate_token(&user.id, user.role_id.as_deref())?;

    Ok(SessionResponse {
        message: message.to_string(),
        token,
        expires_in: jwt.token_expiry_secs(),
        user: identity,
    })
}

// ==================== Public Routes ====================

/// POST /user/register
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    validate_email(&request.email)?;
    validate_password(&request.password)?;
    validate_name(&request.name)?;

    debug!("Registering user: {}", request.email);

    if state.db.get_user_by_email(&request.email).await?.is_some() {
        return Err(ApiError::BadRequest("Email is already registered".to_string()));
    }

    let role = state.db.ensure_role(DEFAULT_ROLE, &[]).await?;
    let password_hash = hash_password(&request.password)?;

    let user = state
        .db
        .insert_user(NewUser {
            name: request.name.trim().to_string(),
            email: request.email,
            password_hash: Some(password_hash),
            google_id: None,
            role_id: Some(role.id),
            active: true,
            auth_type: AuthType::Local,
        })
        .await?;

    info!("Registered user: {}", user.email);

    let session = issue_session(&state, &user, "User registered successfully").await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /user/login
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if request.password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }

    debug!("Login attempt for user: {}", request.email);

    let user = state.db.get_user_by_email(&request.email).await?;

    let stored_hash = user
        .as_ref()
        .and_then(|u| u.password_hash.clone())
        .or_else(|| DUMMY_HASH.clone());
    let password_valid = match stored_hash {
        Some(hash) => verify_password(&request.password, &hash)?,
        None => false,
    };

    let user = match (user, password_valid) {
        (Some(u), true) if u.active => u,
        _ => return Err(AuthError::InvalidCredentials.into()),
    };

    info!("User {} logged in successfully", user.email);

    Ok(Json(issue_session(&state, &user, "Login successful").await?))
}

/// POST /user/google
async fn google_login(
    State(state): State<AppState>,
    Json(request): Json<GoogleLoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let profile = state.google.verify_id_token(&request.credential).await?;
    let Some(email) = profile.email.clone() else {
        return Err(GoogleError::MissingEmail.into());
    };

    let user = match state.db.get_user_by_email(&email).await? {
        Some(user) => {
            if user.google_id.is_none() {
                debug!("Linking Google account to user: {}", user.email);
                state.db.link_google_account(&user.id, &profile.sub).await?;
            }
            user
        }
        None => {
            let role = state.db.ensure_role(DEFAULT_ROLE, &[]).await?;
            let user = state
                .db
                .insert_user(NewUser {
                    name: profile.name.clone().unwrap_or_else(|| email.clone()),
                    email,
                    password_hash: None,
                    google_id: Some(profile.sub.clone()),
                    role_id: Some(role.id),
                    active: true,
                    auth_type: AuthType::Google,
                })
                .await?;
            info!("Created user from Google sign-in: {}", user.email);
            user
        }
    };

    if !user.active {
        return Err(AuthError::InactiveUser.into());
    }

    Ok(Json(
        issue_session(&state, &user, "Google login successful").await?,
    ))
}

// ==================== Authenticated Routes ====================

/// GET /user/verify, GET /user/verify/{token}
async fn verify_session(
    Extension(user): Extension<AuthUser>,
    timezone: Option<Extension<RequestTimezone>>,
) -> Json<VerifyResponse> {
    let (timezone, local_time) = match timezone {
        Some(Extension(RequestTimezone(tz))) => (
            Some(tz.name().to_string()),
            Some(Utc::now().with_timezone(&tz).to_rfc3339()),
        ),
        None => (None, None),
    };

    Json(VerifyResponse {
        user: (*user.identity).clone(),
        cache: user.cache_status.as_str().to_string(),
        timezone,
        local_time,
    })
}

/// POST /user/logout
///
/// Drops the presented token from the validation cache. The token stays
/// cryptographically valid until it expires.
async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    uri: Uri,
) -> StatusCode {
    if let Some(credential) = extract_credential(&headers, uri.query(), None) {
        state.validator.delete_token_from_cache(&credential);
    }

    info!("User {} logged out", user.identity.email);
    StatusCode::NO_CONTENT
}

/// Create user routes
pub fn routes(state: &AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/user/verify", get(verify_session))
        .route("/user/verify/{token}", get(verify_session))
        .route("/user/logout", post(logout))
        .route_layer(from_fn_with_state(state.validator.clone(), require_token));

    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/google", post(google_login))
        .merge(authenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email(&format!("{}@example.com", "a".repeat(250))).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(257)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Ada Lovelace").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"n".repeat(129)).is_err());
    }
}
