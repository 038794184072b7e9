use axum::{
    body::Bytes,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Query parameter carrying the caller's identity; never forwarded upstream.
pub const IDENTITY_QUERY_PARAM: &str = "user_id";

/// A request to be forwarded to the Fleet API.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
}

impl UpstreamRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            accept: None,
            content_type: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Option<Bytes>) -> Self {
        self.body = body.filter(|b| !b.is_empty());
        self
    }

    /// Drop every identity-selector parameter from the outgoing query.
    pub fn strip_identity(mut self) -> Self {
        self.query
            .retain(|(k, _)| !k.eq_ignore_ascii_case(IDENTITY_QUERY_PARAM));
        self
    }
}

/// Upstream reply, kept byte-for-byte.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let content_type = self
            .content_type
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        (self.status, [(header::CONTENT_TYPE, content_type)], self.body).into_response()
    }
}
