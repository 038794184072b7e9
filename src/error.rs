use axum::{
    Json,
    body::Bytes,
    http::{StatusCode, header},
    response::IntoResponse,
};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum GatewayError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("OAuth flow error: {0}")]
    OauthFlow(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Unauthorized after token refresh")]
    AuthorizationExpired,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Upstream responded with status {status}")]
    Upstream {
        status: StatusCode,
        content_type: Option<String>,
        body: Bytes,
    },

    #[error("Partner registration failed with status {status}: {body}")]
    PartnerRegistration { status: StatusCode, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out: {0}")]
    Timeout(String),
}

impl GatewayError {
    /// Status code surfaced to the caller for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthenticated(_)
            | GatewayError::AuthorizationExpired
            | GatewayError::Jwt(_)
            | GatewayError::Oauth2Server { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::Validation(_) | GatewayError::OauthFlow(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            GatewayError::Upstream { status, .. } => *status,
            GatewayError::UrlParse(_)
            | GatewayError::Reqwest(_)
            | GatewayError::Json(_)
            | GatewayError::Database(_)
            | GatewayError::Config(_)
            | GatewayError::Misconfigured(_)
            | GatewayError::Oauth2Token(_)
            | GatewayError::PartnerRegistration { .. }
            | GatewayError::Transport(_)
            | GatewayError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for GatewayError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => GatewayError::Oauth2Server {
                error: match err.error_description() {
                    Some(desc) => format!("{}: {}", err.error(), desc),
                    None => err.error().to_string(),
                },
            },
            RequestTokenError::Request(req_e) => {
                GatewayError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                GatewayError::Json(parse_err.into_inner())
            }
            RequestTokenError::Other(s) => GatewayError::Oauth2Token(s),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error_body = match self {
            GatewayError::Upstream {
                status,
                content_type,
                body,
            } => {
                let content_type =
                    content_type.unwrap_or_else(|| "application/json".to_string());
                return (status, [(header::CONTENT_TYPE, content_type)], body).into_response();
            }
            GatewayError::Database(_)
            | GatewayError::Config(_)
            | GatewayError::Misconfigured(_) => ApiErrorBody {
                code: "INTERNAL_ERROR".to_string(),
                message: "An internal server error occurred.".to_string(),
            },
            GatewayError::Unauthenticated(msg) => ApiErrorBody {
                code: "UNAUTHENTICATED".to_string(),
                message: msg,
            },
            GatewayError::Jwt(_) => ApiErrorBody {
                code: "UNAUTHENTICATED".to_string(),
                message: "invalid token".to_string(),
            },
            GatewayError::AuthorizationExpired => ApiErrorBody {
                code: "UNAUTHORIZED".to_string(),
                message: "unauthorized after token refresh".to_string(),
            },
            GatewayError::Oauth2Server { error } => ApiErrorBody {
                code: "UNAUTHORIZED".to_string(),
                message: format!("token refresh failed: {error}"),
            },
            GatewayError::Forbidden(msg) => ApiErrorBody {
                code: "FORBIDDEN".to_string(),
                message: msg,
            },
            GatewayError::Validation(msg) | GatewayError::OauthFlow(msg) => ApiErrorBody {
                code: "INVALID_REQUEST".to_string(),
                message: msg,
            },
            GatewayError::NotImplemented(msg) => ApiErrorBody {
                code: "NOT_IMPLEMENTED".to_string(),
                message: msg,
            },
            other => ApiErrorBody {
                code: "TRANSPORT_ERROR".to_string(),
                message: other.to_string(),
            },
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn upstream_error_is_passed_through_verbatim() {
        let err = GatewayError::Upstream {
            status: StatusCode::NOT_FOUND,
            content_type: Some("text/plain".to_string()),
            body: Bytes::from_static(b"vehicle not found"),
        };
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/plain");
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"vehicle not found");
    }

    #[tokio::test]
    async fn typed_errors_map_to_statuses() {
        assert_eq!(
            GatewayError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::AuthorizationExpired.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::NotImplemented("x".into()).status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            GatewayError::Transport("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let resp = GatewayError::Validation("invalid vin".into()).into_response();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = std::str::from_utf8(&body).unwrap();
        assert!(body.contains(r#""code":"INVALID_REQUEST""#));
        assert!(body.contains("invalid vin"));
    }
}
