use crate::error::GatewayError;
use crate::router::GatewayState;
use crate::types::upstream::{UpstreamRequest, UpstreamResponse};
use axum::{
    extract::{RawQuery, State},
    http::Method,
};

/// GET /api/partner/public_key?domain=...
pub async fn public_key(
    State(state): State<GatewayState>,
    RawQuery(query): RawQuery,
) -> Result<UpstreamResponse, GatewayError> {
    let query: Vec<(String, String)> = query
        .map(|qs| {
            url::form_urlencoded::parse(qs.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();
    let domain = query
        .iter()
        .find(|(k, _)| k == "domain")
        .map(|(_, v)| v.clone())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| state.partner_domain.clone());

    let req = UpstreamRequest::new(Method::GET, "/api/1/partner_accounts/public_key")
        .with_query(vec![("domain".to_string(), domain)]);
    forward_as_partner(&state, req).await
}

/// GET /api/partner/fleet_telemetry_errors
pub async fn fleet_telemetry_errors(
    State(state): State<GatewayState>,
) -> Result<UpstreamResponse, GatewayError> {
    let req = UpstreamRequest::new(Method::GET, "/api/1/partner_accounts/fleet_telemetry_errors");
    forward_as_partner(&state, req).await
}

async fn forward_as_partner(
    state: &GatewayState,
    req: UpstreamRequest,
) -> Result<UpstreamResponse, GatewayError> {
    let token = state.partner.get_token().await?;
    let resp = state.fleet.send(&req, &token).await?;
    if resp.status.is_client_error() || resp.status.is_server_error() {
        return Err(GatewayError::Upstream {
            status: resp.status,
            content_type: resp.content_type,
            body: resp.body,
        });
    }
    Ok(resp)
}
