//! End-to-end tests of the token validation middleware
//!
//! These drive a small axum router through `tower::ServiceExt::oneshot`
//! with an in-memory identity store that counts lookups.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Extension, Json, Router,
    body::Body,
    http::{Request, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    routing::get,
};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;
use transit_auth::error::{INVALID_SESSION_MESSAGE, VALIDATION_FAILURE_MESSAGE};
use transit_auth::{
    AuthUser, Claims, IdentityStore, JwtManager, RequestTimezone, StoreError, TokenCache,
    TokenCacheConfig, TokenValidator, require_admin, require_token,
};
use transit_db::{AuthType, Identity, RoleSummary};

const SECRET: &str = "test-signing-secret";

#[derive(Default)]
struct FakeStore {
    identities: Mutex<HashMap<String, Identity>>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl FakeStore {
    fn with(identities: Vec<Identity>) -> Arc<Self> {
        let store = FakeStore::default();
        {
            let mut map = store.identities.lock().unwrap();
            for identity in identities {
                map.insert(identity.id.clone(), identity);
            }
        }
        Arc::new(store)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityStore for FakeStore {
    async fn find_identity(&self, user_id: &str) -> Result<Option<Identity>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(self.identities.lock().unwrap().get(user_id).cloned())
    }
}

fn ada() -> Identity {
    Identity {
        id: "U1".to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        active: true,
        auth_type: AuthType::Local,
        role: Some(RoleSummary {
            id: "R-admin".to_string(),
            name: "admin".to_string(),
            routes: vec!["/route/approve".to_string()],
        }),
    }
}

fn grace() -> Identity {
    Identity {
        id: "U2".to_string(),
        name: "Grace".to_string(),
        email: "grace@example.com".to_string(),
        active: true,
        auth_type: AuthType::Google,
        role: Some(RoleSummary {
            id: "R-user".to_string(),
            name: "user".to_string(),
            routes: vec![],
        }),
    }
}

fn validator(store: Arc<FakeStore>, ttl: Duration) -> Arc<TokenValidator> {
    Arc::new(TokenValidator::new(
        Arc::new(JwtManager::new(SECRET, 12)),
        store,
        TokenCache::new(TokenCacheConfig {
            max_entries: 100,
            ttl,
        }),
    ))
}

async fn whoami(
    Extension(user): Extension<AuthUser>,
    timezone: Option<Extension<RequestTimezone>>,
) -> Json<Value> {
    Json(json!({
        "id": user.identity.id,
        "name": user.identity.name,
        "role": user.identity.role_name(),
        "timezone": timezone.map(|Extension(RequestTimezone(tz))| tz.name().to_string()),
    }))
}

fn app(validator: Arc<TokenValidator>) -> Router {
    Router::new()
        .route("/me", get(whoami))
        .route("/me/{token}", get(whoami))
        .route(
            "/admin",
            get(|| async { "admin area" }).route_layer(from_fn(require_admin)),
        )
        .route_layer(from_fn_with_state(validator, require_token))
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn with_header(uri: &str, name: &str, value: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(name, value)
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn cache_header(response: &Response) -> &str {
    response.headers()["x-cache"].to_str().unwrap()
}

fn token_for(user_id: &str) -> String {
    JwtManager::new(SECRET, 12)
        .generate_token(user_id, None)
        .unwrap()
}

#[tokio::test]
async fn test_missing_credential_is_bare_forbidden() {
    let store = FakeStore::with(vec![ada()]);
    let app = app(validator(store.clone(), Duration::from_secs(30)));

    let response = send(&app, Request::builder().uri("/me").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get("x-cache").is_none());
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_miss_then_hit_then_miss_after_ttl() {
    let store = FakeStore::with(vec![ada()]);
    let app = app(validator(store.clone(), Duration::from_millis(300)));
    let t1 = token_for("U1");

    let response = send(&app, with_header("/me", "token", &t1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_header(&response), "MISS");
    let response_time = response.headers()["x-response-time"].to_str().unwrap();
    assert!(response_time.ends_with("ms"));
    let first = body_json(response).await;
    assert_eq!(first["name"], "Ada");
    assert_eq!(first["role"], "admin");
    assert_eq!(store.calls(), 1);

    let response = send(&app, with_header("/me", "token", &t1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_header(&response), "HIT");
    assert_eq!(body_json(response).await, first);
    assert_eq!(store.calls(), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;

    let response = send(&app, with_header("/me", "token", &t1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_header(&response), "MISS");
    assert_eq!(store.calls(), 2);
}

#[tokio::test]
async fn test_wrong_secret_is_rejected_and_never_cached() {
    let store = FakeStore::with(vec![ada()]);
    let validator = validator(store.clone(), Duration::from_secs(30));
    let app = app(validator.clone());
    let t2 = JwtManager::new("not-the-server-secret", 12)
        .generate_token("U1", None)
        .unwrap();

    for _ in 0..2 {
        let response = send(&app, with_header("/me", "authorization", &format!("Bearer {}", t2))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["message"], INVALID_SESSION_MESSAGE);
    }

    assert!(validator.cache().get(&t2).is_none());
    assert_eq!(validator.cache().entry_count(), 0);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let store = FakeStore::with(vec![ada()]);
    let validator = validator(store.clone(), Duration::from_secs(30));
    let app = app(validator.clone());
    let now = Utc::now().timestamp();
    let expired = JwtManager::new(SECRET, 12)
        .encode_claims(&Claims {
            sub: "U1".to_string(),
            role: None,
            exp: now - 3600,
            iat: now - 7200,
        })
        .unwrap();

    let response = send(&app, with_header("/me", "token", &expired)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["message"], INVALID_SESSION_MESSAGE);
    assert!(validator.cache().get(&expired).is_none());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_tampered_token_rejected_even_with_warm_cache() {
    let store = FakeStore::with(vec![ada(), grace()]);
    let app = app(validator(store.clone(), Duration::from_secs(30)));
    let valid = token_for("U2");
    let other = token_for("U1");

    let response = send(&app, with_header("/me", "token", &valid)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Graft U1's payload onto U2's signature
    let valid_parts: Vec<&str> = valid.split('.').collect();
    let other_parts: Vec<&str> = other.split('.').collect();
    let tampered = format!("{}.{}.{}", valid_parts[0], other_parts[1], valid_parts[2]);

    let response = send(&app, with_header("/me", "token", &tampered)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_store_unavailable_is_internal_error_and_not_cached() {
    let store = FakeStore::with(vec![ada()]);
    let validator = validator(store.clone(), Duration::from_secs(30));
    let app = app(validator.clone());
    let t3 = token_for("U1");

    store.set_unavailable(true);
    let response = send(&app, with_header("/me", "token", &t3)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], VALIDATION_FAILURE_MESSAGE);
    assert!(!body.to_string().contains("connection refused"));
    assert!(validator.cache().get(&t3).is_none());

    store.set_unavailable(false);
    let response = send(&app, with_header("/me", "token", &t3)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_header(&response), "MISS");
}

#[tokio::test]
async fn test_unknown_subject_is_internal_error() {
    let store = FakeStore::with(vec![]);
    let validator = validator(store.clone(), Duration::from_secs(30));
    let app = app(validator.clone());
    let token = token_for("deleted-user");

    let response = send(&app, with_header("/me", "token", &token)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["message"], VALIDATION_FAILURE_MESSAGE);
    assert_eq!(validator.cache().entry_count(), 0);
}

#[tokio::test]
async fn test_clear_cache_forces_miss() {
    let store = FakeStore::with(vec![ada()]);
    let validator = validator(store.clone(), Duration::from_secs(30));
    let app = app(validator.clone());
    let t1 = token_for("U1");

    send(&app, with_header("/me", "token", &t1)).await;
    let response = send(&app, with_header("/me", "token", &t1)).await;
    assert_eq!(cache_header(&response), "HIT");

    validator.clear_cache();

    let response = send(&app, with_header("/me", "token", &t1)).await;
    assert_eq!(cache_header(&response), "MISS");
    assert_eq!(store.calls(), 2);
}

#[tokio::test]
async fn test_delete_token_from_cache() {
    let store = FakeStore::with(vec![ada()]);
    let validator = validator(store.clone(), Duration::from_secs(30));
    let app = app(validator.clone());
    let t1 = token_for("U1");

    // Absent token: no-op
    validator.delete_token_from_cache("never-seen");
    validator.delete_token_from_cache(&t1);

    let response = send(&app, with_header("/me", "token", &t1)).await;
    assert_eq!(cache_header(&response), "MISS");

    validator.delete_token_from_cache(&t1);
    let response = send(&app, with_header("/me", "token", &t1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_header(&response), "MISS");
}

#[tokio::test]
async fn test_credential_sources() {
    let store = FakeStore::with(vec![ada(), grace()]);
    let app = app(validator(store, Duration::from_secs(30)));
    let ada_token = token_for("U1");
    let grace_token = token_for("U2");

    let response = send(
        &app,
        Request::builder()
            .uri(format!("/me?token={}", ada_token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body_json(response).await["name"], "Ada");

    let response = send(
        &app,
        Request::builder()
            .uri(format!("/me/{}", grace_token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body_json(response).await["name"], "Grace");

    // Query outranks bearer
    let response = send(
        &app,
        Request::builder()
            .uri(format!("/me?token={}", grace_token))
            .header("authorization", format!("Bearer {}", ada_token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body_json(response).await["name"], "Grace");

    // Custom header outranks the route parameter
    let response = send(
        &app,
        Request::builder()
            .uri(format!("/me/{}", grace_token))
            .header("token", &ada_token)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body_json(response).await["name"], "Ada");
}

#[tokio::test]
async fn test_timezone_header() {
    let store = FakeStore::with(vec![ada()]);
    let app = app(validator(store, Duration::from_secs(30)));
    let t1 = token_for("U1");

    let response = send(
        &app,
        Request::builder()
            .uri("/me")
            .header("token", &t1)
            .header("timezone", "America/Mexico_City")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["timezone"], "America/Mexico_City");

    let response = send(
        &app,
        Request::builder()
            .uri("/me")
            .header("token", &t1)
            .header("timezone", "Not/A_Zone")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["timezone"], Value::Null);
}

#[tokio::test]
async fn test_admin_route_requires_admin_role() {
    let store = FakeStore::with(vec![ada(), grace()]);
    let app = app(validator(store, Duration::from_secs(30)));

    let response = send(&app, with_header("/admin", "token", &token_for("U2"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, with_header("/admin", "token", &token_for("U1"))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_first_use_is_tolerated() {
    let store = FakeStore::with(vec![ada()]);
    let validator = validator(store.clone(), Duration::from_secs(30));
    let t1 = token_for("U1");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let validator = validator.clone();
        let token = t1.clone();
        handles.push(tokio::spawn(async move { validator.validate(&token).await }));
    }

    for handle in handles {
        let validated = handle.await.unwrap().unwrap();
        assert_eq!(validated.identity.name, "Ada");
    }

    let calls = store.calls();
    assert!((1..=8).contains(&calls));

    let validated = validator.validate(&t1).await.unwrap();
    assert_eq!(validated.status, transit_auth::CacheStatus::Hit);
    assert_eq!(store.calls(), calls);
}
