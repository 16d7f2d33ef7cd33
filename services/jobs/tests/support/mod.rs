//! Stub processing backend for integration tests
//!
//! Serves just enough of the auth endpoints to log in and refresh, plus the
//! upload, status and retry endpoints. Status answers follow a script so a
//! test decides which statuses a job goes through.

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const EMAIL: &str = "dana@clinic.org";
pub const PASSWORD: &str = "secret";
pub const JOB_ID: &str = "abc";

/// Status record as the backend serializes it
pub fn record(status: &str, progress: u8, retry_count: u32, max_retries: u32) -> Value {
    let error = (status == "failed").then_some("Speech service timeout");
    json!({
        "job_id": JOB_ID,
        "patient_email": "patient@mail.com",
        "therapist_email": EMAIL,
        "session_date": "2024-05-02",
        "audio_url": "https://blob/recordings/session.wav",
        "transcript_url": null,
        "status": status,
        "transcription_status": status,
        "progress": progress,
        "transcription_error": error,
        "created_at": "2024-05-02T10:15:30.123456",
        "updated_at": "2024-05-02T10:16:00",
        "completed_at": null,
        "retry_count": retry_count,
        "max_retries": max_retries,
    })
}

#[derive(Default)]
pub struct JobsBackend {
    pub status_calls: AtomicUsize,
    pub retry_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    /// Number of upcoming status queries answered with 503
    pub unavailable: AtomicUsize,
    /// When set, the retry endpoint answers 400
    pub reject_retry: AtomicBool,
    /// Status answers in order; the last one repeats
    script: Mutex<VecDeque<Value>>,
    last_upload: Mutex<Vec<u8>>,
    nonce: AtomicUsize,
    access_tokens: Mutex<HashSet<String>>,
    refresh_tokens: Mutex<HashSet<String>>,
}

impl JobsBackend {
    pub fn with_script(script: Vec<Value>) -> Arc<Self> {
        let backend = Self::default();
        *backend.script.lock().expect("lock") = script.into();
        Arc::new(backend)
    }

    fn sign(&self, ttl_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        encode(
            &Header::default(),
            &json!({ "sub": "12", "iat": now, "exp": now + ttl_secs, "jti": nonce }),
            &EncodingKey::from_secret(b"stub-backend-secret"),
        )
        .expect("Failed to sign stub token")
    }

    fn issue_pair(&self) -> (String, String) {
        let access = self.sign(900);
        let refresh = self.sign(7 * 24 * 3600);
        self.access_tokens.lock().expect("lock").insert(access.clone());
        self.refresh_tokens.lock().expect("lock").insert(refresh.clone());
        (access, refresh)
    }

    /// A signed token the backend has never issued
    pub fn foreign_token(&self) -> String {
        self.sign(900)
    }

    pub fn issue_refresh(&self) -> String {
        self.issue_pair().1
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| self.access_tokens.lock().expect("lock").contains(token))
    }

    pub fn statuses(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn retries(&self) -> usize {
        self.retry_calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn last_upload(&self) -> String {
        String::from_utf8_lossy(&self.last_upload.lock().expect("lock")).into_owned()
    }
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Unauthorized" })))
}

async fn login(State(backend): State<Arc<JobsBackend>>, Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"] != EMAIL || body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid email" })),
        );
    }

    let (access, refresh) = backend.issue_pair();
    (
        StatusCode::OK,
        Json(json!({
            "therapist_id": 12,
            "access_token": access,
            "refresh_token": refresh,
            "full_name": "Dana Levi",
            "token_type": "bearer",
        })),
    )
}

async fn refresh(State(backend): State<Arc<JobsBackend>>, Json(body): Json<Value>) -> impl IntoResponse {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let presented = body["refresh_token"].as_str().unwrap_or_default().to_string();

    if !backend.refresh_tokens.lock().expect("lock").remove(&presented) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid refresh token" })),
        );
    }

    let (access, refresh) = backend.issue_pair();
    (
        StatusCode::OK,
        Json(json!({ "access_token": access, "refresh_token": refresh })),
    )
}

async fn upload(
    State(backend): State<Arc<JobsBackend>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    backend.upload_calls.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return unauthorized();
    }

    *backend.last_upload.lock().expect("lock") = body.to_vec();
    (
        StatusCode::OK,
        Json(json!({
            "job_id": JOB_ID,
            "status": "uploaded",
            "message": "Audio uploaded successfully. Processing will begin shortly.",
            "audio_url": "https://blob/recordings/session.wav",
            "processing_status": "pending",
        })),
    )
}

async fn status(
    State(backend): State<Arc<JobsBackend>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    backend.status_calls.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return unauthorized();
    }

    let injected = backend
        .unavailable
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if injected {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "Service unavailable" })),
        );
    }

    let mut script = backend.script.lock().expect("lock");
    let next = if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    };
    match next {
        Some(record) if job_id == JOB_ID => (StatusCode::OK, Json(record)),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Upload job not found" })),
        ),
    }
}

async fn retry(
    State(backend): State<Arc<JobsBackend>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    backend.retry_calls.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return unauthorized();
    }

    if backend.reject_retry.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Maximum retries exceeded" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "retry_queued",
            "message": "Processing retry has been queued",
            "job_id": job_id,
        })),
    )
}

/// Serve the stub on an ephemeral port and return its base URL
pub async fn spawn(backend: Arc<JobsBackend>) -> String {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/audio-async/upload-audio/", post(upload))
        .route("/audio-async/upload-status/:job_id", get(status))
        .route("/audio-async/retry-processing/:job_id", post(retry))
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
