use crate::service::command::transport::ProtocolError;
use base64::{
    Engine as _,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use url::Url;

/// Account context for the signed command protocol, derived from a user's Fleet access token.
#[derive(Clone)]
pub struct VehicleAccount {
    pub host: String,
    pub subject: Option<String>,
    pub user_agent: String,
    oauth_token: String,
}

#[derive(Deserialize)]
struct TokenClaims {
    #[serde(default)]
    aud: Value,
    #[serde(default)]
    sub: Option<String>,
}

impl VehicleAccount {
    /// The signature is not checked here; the Fleet API does that on every call.
    pub fn from_token(oauth_token: &str, user_agent: &str) -> Result<Self, ProtocolError> {
        let payload = oauth_token
            .split('.')
            .nth(1)
            .filter(|_| oauth_token.split('.').count() == 3)
            .ok_or_else(|| ProtocolError::Transport("access token is not a JWT".to_string()))?;

        let raw = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .or_else(|_| URL_SAFE.decode(payload))
            .map_err(|e| ProtocolError::Transport(format!("undecodable token payload: {e}")))?;
        let claims: TokenClaims = serde_json::from_slice(&raw)
            .map_err(|e| ProtocolError::Transport(format!("unparseable token claims: {e}")))?;

        let host = fleet_host(&claims.aud).ok_or_else(|| {
            ProtocolError::Transport("token audience names no Fleet API host".to_string())
        })?;

        Ok(Self {
            host,
            subject: claims.sub,
            user_agent: user_agent.to_string(),
            oauth_token: oauth_token.to_string(),
        })
    }

    pub fn oauth_token(&self) -> &str {
        &self.oauth_token
    }
}

impl fmt::Debug for VehicleAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VehicleAccount")
            .field("host", &self.host)
            .field("subject", &self.subject)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

fn fleet_host(aud: &Value) -> Option<String> {
    let candidates: Vec<&str> = match aud {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    candidates
        .into_iter()
        .filter_map(|c| Url::parse(c).ok())
        .filter_map(|u| u.host_str().map(str::to_string))
        .find(|host| host.starts_with("fleet-api."))
}

#[cfg(test)]
pub(crate) fn fake_fleet_token(aud: Value) -> String {
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(&serde_json::json!({ "aud": aud, "sub": "user-123" })).unwrap(),
    );
    format!("eyJhbGciOiJub25lIn0.{payload}.sig")
}
