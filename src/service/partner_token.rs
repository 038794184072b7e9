use crate::api::FleetApi;
use crate::error::GatewayError;
use crate::fleet_oauth::FleetOauthClient;
use crate::service::user_tokens::default_token_lifetime;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Remaining lifetime under which the cached partner token is replaced.
fn refresh_skew() -> Duration {
    Duration::seconds(30)
}

struct PartnerState {
    token: String,
    expires_at: DateTime<Utc>,
    registered: bool,
}

impl PartnerState {
    fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now + refresh_skew() < self.expires_at
    }
}

/// Process-wide client-credentials token, shared by every caller.
///
/// The first successful fetch also registers the partner domain; later
/// refreshes only replace the token.
pub struct PartnerTokenCache {
    oauth: FleetOauthClient,
    api: FleetApi,
    domain: String,
    state: RwLock<PartnerState>,
}

impl PartnerTokenCache {
    /// Fetches the first token and registers the domain. Any failure here is fatal to startup.
    pub async fn new(
        oauth: FleetOauthClient,
        api: FleetApi,
        domain: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let domain = domain.into();
        if domain.trim().is_empty() {
            return Err(GatewayError::Misconfigured(
                "fleet.partner_domain must be set".to_string(),
            ));
        }
        let cache = Self {
            oauth,
            api,
            domain,
            state: RwLock::new(PartnerState {
                token: String::new(),
                expires_at: DateTime::<Utc>::MIN_UTC,
                registered: false,
            }),
        };
        {
            let mut state = cache.state.write().await;
            cache.refresh_locked(&mut state).await?;
        }
        Ok(cache)
    }

    /// Cached token while it has more than the skew left, otherwise a fresh one.
    pub async fn get_token(&self) -> Result<String, GatewayError> {
        {
            let state = self.state.read().await;
            if state.is_fresh_at(Utc::now()) {
                return Ok(state.token.clone());
            }
        }

        let mut state = self.state.write().await;
        // Another caller may have refreshed while we waited for the write lock.
        if state.is_fresh_at(Utc::now()) {
            return Ok(state.token.clone());
        }
        self.refresh_locked(&mut state).await?;
        Ok(state.token.clone())
    }

    async fn refresh_locked(&self, state: &mut PartnerState) -> Result<(), GatewayError> {
        let grant = self.oauth.client_credentials().await?;
        if grant.access_token.is_empty() {
            return Err(GatewayError::Oauth2Token(
                "partner token response carried no access token".to_string(),
            ));
        }
        let expires_at = grant.expires_at(Utc::now(), default_token_lifetime());

        if !state.registered {
            self.api
                .register_partner(&grant.access_token, &self.domain)
                .await?;
            state.registered = true;
            info!(domain = %self.domain, "partner domain registered");
        }

        state.token = grant.access_token;
        state.expires_at = expires_at;
        debug!(expires_at = %expires_at, "partner token refreshed");
        Ok(())
    }
}
