use crate::api::FleetApi;
use crate::error::GatewayError;
use crate::fleet_oauth::UserCredential;
use crate::service::user_tokens::{UserTokenManager, proxy_lead_time};
use crate::types::upstream::{UpstreamRequest, UpstreamResponse};
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Forwards a caller's request to the Fleet API under the caller's own credential.
#[derive(Clone)]
pub struct ProxyPipeline {
    tokens: Arc<UserTokenManager>,
    api: FleetApi,
}

impl ProxyPipeline {
    pub fn new(tokens: Arc<UserTokenManager>, api: FleetApi) -> Self {
        Self { tokens, api }
    }

    pub fn tokens(&self) -> &Arc<UserTokenManager> {
        &self.tokens
    }

    /// Load, proactively refresh, then forward.
    pub async fn forward(
        &self,
        user_id: Uuid,
        req: UpstreamRequest,
    ) -> Result<UpstreamResponse, GatewayError> {
        let credential = self.tokens.load(user_id).await?;
        let credential = self.tokens.ensure_valid(credential, proxy_lead_time()).await?;
        self.forward_with(credential, req).await
    }

    /// Forward with an already-valid credential. One 401 triggers one refresh and one retry.
    pub async fn forward_with(
        &self,
        credential: UserCredential,
        req: UpstreamRequest,
    ) -> Result<UpstreamResponse, GatewayError> {
        let req = req.strip_identity();
        let mut resp = self.api.send(&req, &credential.access_token).await?;

        if resp.status == StatusCode::UNAUTHORIZED {
            warn!(user_id = %credential.user_id, path = %req.path, "upstream rejected access token, refreshing");
            let refreshed = self.tokens.refresh(&credential).await?;
            resp = self.api.send(&req, &refreshed.access_token).await?;
            if resp.status == StatusCode::UNAUTHORIZED {
                warn!(user_id = %credential.user_id, path = %req.path, "upstream still unauthorized after refresh");
                return Err(GatewayError::AuthorizationExpired);
            }
        }

        if resp.status.is_client_error() || resp.status.is_server_error() {
            info!(path = %req.path, status = resp.status.as_u16(), "passing upstream error through");
            return Err(GatewayError::Upstream {
                status: resp.status,
                content_type: resp.content_type,
                body: resp.body,
            });
        }
        Ok(resp)
    }
}
