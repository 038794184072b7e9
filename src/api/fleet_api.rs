use crate::config::{BasicConfig, FleetConfig};
use crate::error::GatewayError;
use crate::types::upstream::{UpstreamRequest, UpstreamResponse};
use axum::http::{StatusCode, header};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Build the shared outbound HTTP client used for OAuth and Fleet API calls.
pub fn build_http_client(
    basic: &BasicConfig,
    fleet: &FleetConfig,
) -> Result<reqwest::Client, GatewayError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(fleet.user_agent.clone())
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        // OAuth token endpoints must not follow redirects
        .redirect(reqwest::redirect::Policy::none());
    if let Some(proxy_url) = basic.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}

/// Stateless Fleet API access: bearer-authenticated passthrough plus partner registration.
#[derive(Clone)]
pub struct FleetApi {
    http: reqwest::Client,
    base: String,
}

impl FleetApi {
    pub fn new(http: reqwest::Client, fleet: &FleetConfig) -> Self {
        Self {
            http,
            base: fleet.api_base().to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        }
    }

    /// Send `req` with `bearer` attached. The response is returned as-is, whatever its status.
    pub async fn send(
        &self,
        req: &UpstreamRequest,
        bearer: &str,
    ) -> Result<UpstreamResponse, GatewayError> {
        let mut builder = self
            .http
            .request(req.method.clone(), self.url_for(&req.path))
            .bearer_auth(bearer);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(accept) = req.accept.as_deref() {
            builder = builder.header(header::ACCEPT, accept);
        }
        if let Some(body) = req.body.clone() {
            let content_type = req
                .content_type
                .clone()
                .unwrap_or_else(|| "application/json".to_string());
            builder = builder.header(header::CONTENT_TYPE, content_type).body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?;
        debug!(method = %req.method, path = %req.path, status = status.as_u16(), "Fleet API responded");
        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }

    /// Register this gateway's domain as a partner account. Already-registered counts as success.
    pub async fn register_partner(&self, token: &str, domain: &str) -> Result<(), GatewayError> {
        let resp = self
            .http
            .post(self.url_for("/api/1/partner_accounts"))
            .bearer_auth(token)
            .json(&json!({ "domain": domain }))
            .send()
            .await?;

        let status = resp.status();
        match status {
            StatusCode::OK | StatusCode::CREATED | StatusCode::CONFLICT => {
                info!(domain, status = status.as_u16(), "Partner account registered");
                Ok(())
            }
            _ => {
                let body = resp.text().await.unwrap_or_default();
                warn!(domain, status = status.as_u16(), "Partner registration rejected");
                Err(GatewayError::PartnerRegistration { status, body })
            }
        }
    }
}
