use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use warp::http::StatusCode;

use rusty_users::auth::{AuthorizationGate, CredentialRecord, NewUser, SessionService, TokenManager};
use rusty_users::clock::ManualClock;
use rusty_users::error::{Result, RustyUsersError};
use rusty_users::handlers::{create_routes, AppState};
use rusty_users::storage::{
    CredentialStore, MemoryCredentialStore, MemoryTokenRevocationStore, RevocationEntry,
    RevocationStats, TokenRevocationStore,
};

const SECRET: &str = "api_test_signing_key_0123456789_abcdef";

async fn app() -> (Arc<ManualClock>, AppState) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let tokens = Arc::new(TokenManager::new(SECRET, Duration::hours(24), clock.clone()));
    let revocations = Arc::new(MemoryTokenRevocationStore::new());
    let gate = Arc::new(AuthorizationGate::new(tokens.clone(), revocations.clone()));
    let sessions = Arc::new(SessionService::new(
        Arc::new(MemoryCredentialStore::new()),
        revocations,
        tokens,
        Duration::hours(1),
        std::time::Duration::ZERO,
    ));

    sessions
        .register(NewUser {
            firstname: "Barbara".to_string(),
            lastname: "Liskov".to_string(),
            email: "barbara@example.com".to_string(),
            password: "substitution".to_string(),
        })
        .await
        .unwrap();

    (clock, AppState { gate, sessions })
}

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

async fn login(state: &AppState) -> String {
    let routes = create_routes(state.clone());
    let response = warp::test::request()
        .method("POST")
        .path("/users/login")
        .json(&json!({ "email": "barbara@example.com", "password": "substitution" }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.body());
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["error"], false);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_login_and_profile() {
    let (_, state) = app().await;
    let token = login(&state).await;
    let routes = create_routes(state);

    let response = warp::test::request()
        .method("GET")
        .path("/users/me")
        .header("authorization", format!("Bearer {}", token))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.body());
    assert_eq!(body["data"]["email"], "barbara@example.com");
    assert!(body["data"].get("password_hash").is_none());
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_login_failures_share_response() {
    let (_, state) = app().await;
    let routes = create_routes(state);

    let wrong_password = warp::test::request()
        .method("POST")
        .path("/users/login")
        .json(&json!({ "email": "barbara@example.com", "password": "nope-nope" }))
        .reply(&routes)
        .await;
    let unknown_user = warp::test::request()
        .method("POST")
        .path("/users/login")
        .json(&json!({ "email": "ghost@example.com", "password": "substitution" }))
        .reply(&routes)
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body(), unknown_user.body());
    assert_eq!(body_json(wrong_password.body())["message"], "invalid email or password");
}

#[tokio::test]
async fn test_login_rejects_bad_body() {
    let (_, state) = app().await;
    let routes = create_routes(state);

    let response = warp::test::request()
        .method("POST")
        .path("/users/login")
        .header("content-type", "application/json")
        .body("{\"email\": 42}")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_route_header_errors() {
    let (_, state) = app().await;
    let routes = create_routes(state);

    let missing = warp::test::request()
        .method("GET")
        .path("/users/me")
        .reply(&routes)
        .await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(missing.body())["message"], "Authorization header is required");

    let wrong_scheme = warp::test::request()
        .method("GET")
        .path("/users/me")
        .header("authorization", "Token abc")
        .reply(&routes)
        .await;
    assert_eq!(wrong_scheme.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(wrong_scheme.body())["message"], "Bearer token is required");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let (_, state) = app().await;
    let token = login(&state).await;
    let routes = create_routes(state);
    let header = format!("Bearer {}", token);

    let response = warp::test::request()
        .method("POST")
        .path("/users/logout")
        .header("authorization", &header)
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response.body())["message"], "Successfully logged out");

    let again = warp::test::request()
        .method("POST")
        .path("/users/logout")
        .header("authorization", &header)
        .reply(&routes)
        .await;
    assert_eq!(again.status(), StatusCode::OK);

    let denied = warp::test::request()
        .method("GET")
        .path("/users/me")
        .header("authorization", &header)
        .reply(&routes)
        .await;
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(denied.body())["message"], "Unauthorized");
}

#[tokio::test]
async fn test_logout_without_token() {
    let (_, state) = app().await;
    let routes = create_routes(state);

    let response = warp::test::request()
        .method("POST")
        .path("/users/logout")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response.body())["message"], "No token provided");
}

#[tokio::test]
async fn test_expired_and_revoked_look_alike() {
    let (clock, state) = app().await;
    let revoked = login(&state).await;
    let expired = login(&state).await;
    let routes = create_routes(state);

    warp::test::request()
        .method("POST")
        .path("/users/logout")
        .header("authorization", format!("Bearer {}", revoked))
        .reply(&routes)
        .await;

    let revoked_response = warp::test::request()
        .method("GET")
        .path("/users/me")
        .header("authorization", format!("Bearer {}", revoked))
        .reply(&routes)
        .await;

    clock.advance(Duration::hours(25));
    let expired_response = warp::test::request()
        .method("GET")
        .path("/users/me")
        .header("authorization", format!("Bearer {}", expired))
        .reply(&routes)
        .await;

    assert_eq!(revoked_response.status(), expired_response.status());
    assert_eq!(revoked_response.body(), expired_response.body());
}

#[tokio::test]
async fn test_create_user_requires_auth_and_validates() {
    let (_, state) = app().await;
    let token = login(&state).await;
    let routes = create_routes(state);
    let new_user = json!({
        "firstname": "Edsger",
        "lastname": "Dijkstra",
        "email": "edsger@example.com",
        "password": "shortest-path"
    });

    let anonymous = warp::test::request()
        .method("POST")
        .path("/users")
        .json(&new_user)
        .reply(&routes)
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let created = warp::test::request()
        .method("POST")
        .path("/users")
        .header("authorization", format!("Bearer {}", token))
        .json(&new_user)
        .reply(&routes)
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(body_json(created.body())["data"]["email"], "edsger@example.com");

    let duplicate = warp::test::request()
        .method("POST")
        .path("/users")
        .header("authorization", format!("Bearer {}", token))
        .json(&new_user)
        .reply(&routes)
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(duplicate.body())["message"], "email already exists");

    let invalid = warp::test::request()
        .method("POST")
        .path("/users")
        .header("authorization", format!("Bearer {}", token))
        .json(&json!({
            "firstname": "No",
            "lastname": "Email",
            "email": "not-an-email",
            "password": "long-enough"
        }))
        .reply(&routes)
        .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_new_user_can_login() {
    let (_, state) = app().await;
    let token = login(&state).await;
    let routes = create_routes(state);

    warp::test::request()
        .method("POST")
        .path("/users")
        .header("authorization", format!("Bearer {}", token))
        .json(&json!({
            "firstname": "Edsger",
            "lastname": "Dijkstra",
            "email": "edsger@example.com",
            "password": "shortest-path"
        }))
        .reply(&routes)
        .await;

    let response = warp::test::request()
        .method("POST")
        .path("/users/login")
        .json(&json!({ "email": "edsger@example.com", "password": "shortest-path" }))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let (_, state) = app().await;
    let routes = create_routes(state);

    let response = warp::test::request().path("/health").reply(&routes).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response.body())["status"], "ok");
}

struct DownRevocations;

#[async_trait]
impl TokenRevocationStore for DownRevocations {
    async fn revoke_token(&self, _entry: RevocationEntry) -> Result<()> {
        Err(RustyUsersError::StoreUnavailable("connection refused".to_string()))
    }

    async fn is_token_revoked(&self, _token_key: &str) -> Result<bool> {
        Err(RustyUsersError::StoreUnavailable("connection refused".to_string()))
    }

    async fn cleanup_expired_revocations(&self, _now: DateTime<Utc>) -> Result<usize> {
        Err(RustyUsersError::StoreUnavailable("connection refused".to_string()))
    }

    async fn get_revocation_stats(&self, _now: DateTime<Utc>) -> Result<RevocationStats> {
        Err(RustyUsersError::StoreUnavailable("connection refused".to_string()))
    }
}

struct DownCredentials;

#[async_trait]
impl CredentialStore for DownCredentials {
    async fn find_by_email(&self, _email: &str) -> Result<Option<CredentialRecord>> {
        Err(RustyUsersError::StoreUnavailable("connection refused".to_string()))
    }

    async fn insert(&self, _record: CredentialRecord) -> Result<()> {
        Err(RustyUsersError::StoreUnavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_store_outages_answer_service_unavailable() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let tokens = Arc::new(TokenManager::new(SECRET, Duration::hours(24), clock));
    let revocations = Arc::new(DownRevocations);
    let state = AppState {
        gate: Arc::new(AuthorizationGate::new(tokens.clone(), revocations.clone())),
        sessions: Arc::new(SessionService::new(
            Arc::new(DownCredentials),
            revocations,
            tokens.clone(),
            Duration::hours(1),
            std::time::Duration::ZERO,
        )),
    };
    let routes = create_routes(state);
    let token = tokens.issue("barbara@example.com").unwrap().token;

    let profile = warp::test::request()
        .method("GET")
        .path("/users/me")
        .header("authorization", format!("Bearer {}", token))
        .reply(&routes)
        .await;
    assert_eq!(profile.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(profile.body());
    assert_eq!(body["message"], "Service temporarily unavailable");
    assert_eq!(body["error"], true);

    let login = warp::test::request()
        .method("POST")
        .path("/users/login")
        .json(&json!({ "email": "barbara@example.com", "password": "substitution" }))
        .reply(&routes)
        .await;
    assert_eq!(login.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(login.body())["message"], "Service temporarily unavailable");
}
