#![allow(dead_code)]

use axum::{
    Form, Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::post,
};
use fleet_gateway::config::{Config, FleetConfig};
use fleet_gateway::db::TokenStorage;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpListener;

pub const JWT_SECRET: &str = "integration-test-secret";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Bytes,
}

#[derive(Default)]
pub struct Upstream {
    pub refreshes: AtomicUsize,
    pub code_grants: AtomicUsize,
    pub partner_grants: AtomicUsize,
    pub registrations: AtomicUsize,
    script: Mutex<VecDeque<(StatusCode, Option<&'static str>, String)>>,
    recorded: Mutex<Vec<Recorded>>,
}

impl Upstream {
    pub fn push(&self, status: StatusCode, body: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back((status, Some("application/json"), body.to_string()));
    }

    /// Next Fleet reply carries no Content-Type header at all.
    pub fn push_untyped(&self, status: StatusCode, body: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back((status, None, body.to_string()));
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }
}

pub async fn start_upstream() -> (String, Arc<Upstream>) {
    let upstream = Arc::new(Upstream::default());
    let app = Router::new()
        .route("/oauth2/v3/token", post(token))
        .route("/api/1/partner_accounts", post(register))
        .fallback(fleet)
        .with_state(upstream.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), upstream)
}

async fn token(
    State(up): State<Arc<Upstream>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let n = match form.get("grant_type").map(String::as_str) {
        Some("client_credentials") => {
            let n = up.partner_grants.fetch_add(1, Ordering::SeqCst) + 1;
            return Json(json!({
                "access_token": format!("partner-{n}"),
                "token_type": "Bearer",
                "expires_in": 3600,
            }));
        }
        Some("authorization_code") => {
            let n = up.code_grants.fetch_add(1, Ordering::SeqCst) + 1;
            return Json(json!({
                "access_token": format!("code-access-{n}"),
                "refresh_token": format!("code-refresh-{n}"),
                "token_type": "Bearer",
                "expires_in": 3600,
            }));
        }
        Some("refresh_token") => up.refreshes.fetch_add(1, Ordering::SeqCst) + 1,
        _ => 0,
    };
    Json(json!({
        "access_token": format!("user-access-{n}"),
        "refresh_token": format!("user-refresh-{n}"),
        "token_type": "Bearer",
        "expires_in": 3600,
    }))
}

async fn register(State(up): State<Arc<Upstream>>) -> impl IntoResponse {
    up.registrations.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({"response": {}})))
}

async fn fleet(
    State(up): State<Arc<Upstream>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    up.recorded.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    let (status, content_type, body) = up.script.lock().unwrap().pop_front().unwrap_or((
        StatusCode::OK,
        Some("application/json"),
        r#"{"response":"ok"}"#.to_string(),
    ));
    let mut resp = Response::builder().status(status);
    if let Some(content_type) = content_type {
        resp = resp.header(header::CONTENT_TYPE, content_type);
    }
    resp.body(Body::from(body)).unwrap()
}

pub fn config(base: &str) -> Config {
    let mut cfg = Config::default();
    cfg.jwt.secret = JWT_SECRET.to_string();
    cfg.fleet = FleetConfig {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uri: "http://localhost:8080/api/login/callback".to_string(),
        auth_url: format!("{base}/oauth2/v3/authorize"),
        token_url: format!("{base}/oauth2/v3/token"),
        api_url: base.to_string(),
        partner_token_url: format!("{base}/oauth2/v3/token"),
        partner_domain: "gateway.example.com".to_string(),
        ..FleetConfig::default()
    };
    cfg
}

pub struct TempDb {
    path: std::path::PathBuf,
    pub storage: TokenStorage,
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

pub async fn temp_db(tag: &str) -> TempDb {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "fleet-gateway-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    let storage = fleet_gateway::db::connect(&format!("sqlite:{}", path.display()))
        .await
        .expect("open temp database");
    TempDb { path, storage }
}
