//! In-process stand-ins for the OAuth provider and the Fleet API.

use crate::config::FleetConfig;
use crate::db::TokenStorage;
use axum::{
    Form, Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Bytes,
}

pub struct MockState {
    pub code_grants: AtomicUsize,
    pub refresh_grants: AtomicUsize,
    pub partner_grants: AtomicUsize,
    pub registrations: AtomicUsize,
    refresh_rotates: AtomicBool,
    refresh_rejects: AtomicBool,
    user_expires_in: AtomicU64,
    partner_expires_in: AtomicU64,
    partner_delay_ms: AtomicU64,
    register_status: AtomicU16,
    last_partner_form: Mutex<HashMap<String, String>>,
    last_register_bearer: Mutex<Option<String>>,
    fleet_script: Mutex<VecDeque<(StatusCode, &'static str, String)>>,
    fleet_requests: Mutex<Vec<RecordedRequest>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            code_grants: AtomicUsize::new(0),
            refresh_grants: AtomicUsize::new(0),
            partner_grants: AtomicUsize::new(0),
            registrations: AtomicUsize::new(0),
            refresh_rotates: AtomicBool::new(true),
            refresh_rejects: AtomicBool::new(false),
            user_expires_in: AtomicU64::new(3600),
            partner_expires_in: AtomicU64::new(3600),
            partner_delay_ms: AtomicU64::new(0),
            register_status: AtomicU16::new(201),
            last_partner_form: Mutex::new(HashMap::new()),
            last_register_bearer: Mutex::new(None),
            fleet_script: Mutex::new(VecDeque::new()),
            fleet_requests: Mutex::new(Vec::new()),
        }
    }
}

pub struct MockUpstream {
    pub base: String,
    pub state: Arc<MockState>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/oauth2/v3/token", post(user_token))
            .route("/partner/token", post(partner_token))
            .route("/api/1/partner_accounts", post(register_partner))
            .fallback(fleet_api)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base: format!("http://{addr}"),
            state,
        }
    }

    pub fn set_refresh_rotates(&self, rotates: bool) {
        self.state.refresh_rotates.store(rotates, Ordering::SeqCst);
    }

    pub fn set_refresh_rejects(&self, rejects: bool) {
        self.state.refresh_rejects.store(rejects, Ordering::SeqCst);
    }

    pub fn set_user_expires_in(&self, secs: u64) {
        self.state.user_expires_in.store(secs, Ordering::SeqCst);
    }

    pub fn set_partner_expires_in(&self, secs: u64) {
        self.state.partner_expires_in.store(secs, Ordering::SeqCst);
    }

    pub fn set_partner_delay(&self, delay: Duration) {
        self.state
            .partner_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_register_status(&self, status: StatusCode) {
        self.state
            .register_status
            .store(status.as_u16(), Ordering::SeqCst);
    }

    /// Queue a reply for the next Fleet API call. Unscripted calls get `200 {"response":"ok"}`.
    pub fn push_fleet_response(&self, status: StatusCode, content_type: &'static str, body: &str) {
        self.state
            .fleet_script
            .lock()
            .unwrap()
            .push_back((status, content_type, body.to_string()));
    }

    pub fn fleet_requests(&self) -> Vec<RecordedRequest> {
        self.state.fleet_requests.lock().unwrap().clone()
    }

    pub fn last_partner_form(&self) -> HashMap<String, String> {
        self.state.last_partner_form.lock().unwrap().clone()
    }

    pub fn last_register_bearer(&self) -> Option<String> {
        self.state.last_register_bearer.lock().unwrap().clone()
    }

    pub fn refresh_grants(&self) -> usize {
        self.state.refresh_grants.load(Ordering::SeqCst)
    }

    pub fn partner_grants(&self) -> usize {
        self.state.partner_grants.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> usize {
        self.state.registrations.load(Ordering::SeqCst)
    }
}

async fn user_token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let expires_in = state.user_expires_in.load(Ordering::SeqCst);
    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => {
            let n = state.code_grants.fetch_add(1, Ordering::SeqCst) + 1;
            (
                StatusCode::OK,
                Json(json!({
                    "access_token": format!("code-access-{n}"),
                    "refresh_token": format!("code-refresh-{n}"),
                    "token_type": "Bearer",
                    "expires_in": expires_in,
                })),
            )
        }
        Some("refresh_token") => {
            if state.refresh_rejects.load(Ordering::SeqCst) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant", "error_description": "revoked"})),
                );
            }
            let n = state.refresh_grants.fetch_add(1, Ordering::SeqCst) + 1;
            let mut body = json!({
                "access_token": format!("user-access-{n}"),
                "token_type": "Bearer",
                "expires_in": expires_in,
            });
            if state.refresh_rotates.load(Ordering::SeqCst) {
                body["refresh_token"] = json!(format!("user-refresh-{n}"));
            }
            (StatusCode::OK, Json(body))
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        ),
    }
}

async fn partner_token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let delay = state.partner_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    *state.last_partner_form.lock().unwrap() = form;
    let n = state.partner_grants.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("partner-{n}"),
        "token_type": "Bearer",
        "expires_in": state.partner_expires_in.load(Ordering::SeqCst),
    }))
}

async fn register_partner(State(state): State<Arc<MockState>>, headers: HeaderMap) -> impl IntoResponse {
    state.registrations.fetch_add(1, Ordering::SeqCst);
    *state.last_register_bearer.lock().unwrap() = bearer(&headers);
    let status = StatusCode::from_u16(state.register_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::CREATED);
    (status, Json(json!({"response": {"domain": "gateway.example.com"}})))
}

async fn fleet_api(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    state.fleet_requests.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    let (status, content_type, body) = state
        .fleet_script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((StatusCode::OK, "application/json", r#"{"response":"ok"}"#.to_string()));
    (status, [(header::CONTENT_TYPE, content_type)], body)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Fleet settings pointing every upstream at `upstream`.
pub fn fleet_config(upstream: &MockUpstream) -> FleetConfig {
    FleetConfig {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uri: "http://localhost:8080/api/login/callback".to_string(),
        auth_url: format!("{}/oauth2/v3/authorize", upstream.base),
        token_url: format!("{}/oauth2/v3/token", upstream.base),
        api_url: upstream.base.clone(),
        partner_token_url: format!("{}/partner/token", upstream.base),
        partner_domain: "gateway.example.com".to_string(),
        ..FleetConfig::default()
    }
}

/// Removes the backing SQLite file when dropped.
pub struct TempDbGuard(std::path::PathBuf);

impl Drop for TempDbGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

pub async fn temp_storage() -> (TokenStorage, TempDbGuard) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "fleet-gateway-test-{}-{}-{}.sqlite",
        std::process::id(),
        nanos,
        uuid::Uuid::new_v4()
    ));
    let storage = crate::db::connect(&format!("sqlite:{}", path.display()))
        .await
        .expect("open temp database");
    (storage, TempDbGuard(path))
}
