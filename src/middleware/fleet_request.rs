use axum::{
    RequestExt,
    body::Bytes,
    extract::{FromRequest, Path, RawQuery, Request},
    http::{Method, header},
};
use std::collections::HashMap;
use url::Url;

use crate::error::GatewayError;
use crate::types::upstream::{DEFAULT_CONTENT_TYPE, UpstreamRequest};

/// Everything the proxy needs from an inbound request, independent of the route.
#[derive(Debug, Clone)]
pub struct FleetRequest {
    pub method: Method,
    pub params: HashMap<String, String>,
    pub query: Vec<(String, String)>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl<S> FromRequest<S> for FleetRequest
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(mut req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = req
            .extract_parts::<Path<HashMap<String, String>>>()
            .await
            .map_err(|e| GatewayError::Validation(e.body_text()))?;
        let RawQuery(raw_query) = req
            .extract_parts::<RawQuery>()
            .await
            .map_err(|_| GatewayError::Validation("unreadable query".to_string()))?;

        let (accept, content_type) = {
            let header_value = |name: header::HeaderName| {
                req.headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            };
            (header_value(header::ACCEPT), header_value(header::CONTENT_TYPE))
        };
        let method = req.method().clone();

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| GatewayError::Validation(e.body_text()))?;

        Ok(Self {
            method,
            params,
            query: parse_query(raw_query.as_deref()),
            accept,
            content_type,
            body,
        })
    }
}

impl FleetRequest {
    /// Build the upstream request for `template`, e.g. `/api/1/vehicles/{vehicle_tag}/vehicle_data`.
    pub fn to_upstream(&self, template: &str) -> Result<UpstreamRequest, GatewayError> {
        let path = render_path(template, &self.params)?;
        let mut req = UpstreamRequest::new(self.method.clone(), path).with_query(self.query.clone());
        req.accept = self.accept.clone();
        if self.method != Method::GET && self.method != Method::HEAD {
            req = req.with_body(Some(self.body.clone()));
            if req.body.is_some() {
                req.content_type = Some(
                    self.content_type
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                );
            }
        }
        Ok(req)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}

fn parse_query(raw: Option<&str>) -> Vec<(String, String)> {
    raw.map(|qs| {
        url::form_urlencoded::parse(qs.as_bytes())
            .into_owned()
            .collect()
    })
    .unwrap_or_default()
}

/// Substitute `{name}` segments with percent-encoded values. `{*name}` may span segments.
pub fn render_path(template: &str, params: &HashMap<String, String>) -> Result<String, GatewayError> {
    let mut url = Url::parse("http://fleet.invalid/")?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| GatewayError::Validation("invalid path template".to_string()))?;
        segments.clear();
        for segment in template.trim_start_matches('/').split('/') {
            let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
                segments.push(segment);
                continue;
            };
            let (name, multi) = match name.strip_prefix('*') {
                Some(rest) => (rest, true),
                None => (name, false),
            };
            let value = params
                .get(name)
                .map(|v| v.trim_matches('/'))
                .filter(|v| !v.is_empty())
                .ok_or_else(|| GatewayError::Validation(format!("missing path parameter '{name}'")))?;
            if multi {
                segments.extend(value.split('/'));
            } else {
                segments.push(value);
            }
        }
    }
    Ok(url.path().to_string())
}
