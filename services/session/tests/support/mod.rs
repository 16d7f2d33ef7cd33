//! Stub auth backend for integration tests
//!
//! Serves the auth endpoints plus one protected `/data` route on an
//! ephemeral local port, and counts every call so tests can assert how many
//! refreshes and attempts a scenario produced.

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use session::navigator::LoginNavigator;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const EMAIL: &str = "dana@clinic.org";
pub const PASSWORD: &str = "secret";

/// Sign a token expiring `ttl_secs` from now (negative for already expired)
pub fn signed_token(subject: &str, ttl_secs: i64, nonce: usize) -> String {
    let now = Utc::now().timestamp();
    encode(
        &Header::default(),
        &json!({
            "sub": subject,
            "role": "therapist",
            "iat": now,
            "exp": now + ttl_secs,
            "jti": nonce,
        }),
        &EncodingKey::from_secret(b"stub-backend-secret"),
    )
    .expect("Failed to sign stub token")
}

#[derive(Default)]
pub struct AuthBackend {
    pub refresh_calls: AtomicUsize,
    pub data_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    /// When set, `/data` answers 401 whatever the token
    pub reject_all: AtomicBool,
    nonce: AtomicUsize,
    access_tokens: Mutex<HashSet<String>>,
    refresh_tokens: Mutex<HashSet<String>>,
}

impl AuthBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Issue an access token the backend accepts
    pub fn issue_access(&self, ttl_secs: i64) -> String {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let token = signed_token("12", ttl_secs, nonce);
        self.access_tokens
            .lock()
            .expect("lock")
            .insert(token.clone());
        token
    }

    /// Issue a refresh token the backend accepts
    pub fn issue_refresh(&self) -> String {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let token = signed_token("12", 7 * 24 * 3600, nonce);
        self.refresh_tokens
            .lock()
            .expect("lock")
            .insert(token.clone());
        token
    }

    /// A signed token the backend has never issued
    pub fn foreign_token(&self, ttl_secs: i64) -> String {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        signed_token("12", ttl_secs, nonce)
    }

    fn accepts_access(&self, headers: &HeaderMap) -> bool {
        let Some(token) = bearer(headers) else {
            return false;
        };
        let known = self.access_tokens.lock().expect("lock").contains(token);
        known && !session::is_expired(token)
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn data_requests(&self) -> usize {
        self.data_calls.load(Ordering::SeqCst)
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

async fn login(State(backend): State<Arc<AuthBackend>>, Json(body): Json<Value>) -> impl IntoResponse {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    if email != EMAIL || password != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid email" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "therapist_id": 12,
            "access_token": backend.issue_access(900),
            "refresh_token": backend.issue_refresh(),
            "full_name": "Dana Levi",
            "token_type": "bearer",
        })),
    )
}

async fn refresh(State(backend): State<Arc<AuthBackend>>, Json(body): Json<Value>) -> impl IntoResponse {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let presented = body["refresh_token"].as_str().unwrap_or_default().to_string();

    let known = backend
        .refresh_tokens
        .lock()
        .expect("lock")
        .remove(&presented);
    if !known {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid refresh token" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "access_token": backend.issue_access(900),
            "refresh_token": backend.issue_refresh(),
        })),
    )
}

async fn validate(State(backend): State<Arc<AuthBackend>>, headers: HeaderMap) -> impl IntoResponse {
    if backend.accepts_access(&headers) {
        (StatusCode::OK, Json(json!({ "valid": true })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Unauthorized" })))
    }
}

async fn logout(State(backend): State<Arc<AuthBackend>>) -> impl IntoResponse {
    backend.logout_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "message": "Logged out successfully" }))
}

async fn data(State(backend): State<Arc<AuthBackend>>, headers: HeaderMap) -> impl IntoResponse {
    backend.data_calls.fetch_add(1, Ordering::SeqCst);

    if backend.reject_all.load(Ordering::SeqCst) || !backend.accepts_access(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Unauthorized" })));
    }
    (StatusCode::OK, Json(json!({ "sessions": [] })))
}

/// Serve the stub on an ephemeral port and return its base URL
pub async fn spawn(backend: Arc<AuthBackend>) -> String {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/validate-token", post(validate))
        .route("/auth/logout", post(logout))
        .route("/data", get(data))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub backend");
    let addr = listener.local_addr().expect("Failed to read stub address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub backend stopped");
    });

    format!("http://{}", addr)
}

/// Navigator counting redirects to login
#[derive(Default)]
pub struct CountingNavigator {
    redirects: AtomicUsize,
}

impl CountingNavigator {
    pub fn count(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl LoginNavigator for CountingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}
