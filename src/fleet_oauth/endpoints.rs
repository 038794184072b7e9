use crate::config::FleetConfig;
use crate::error::GatewayError;
use crate::fleet_oauth::credentials::TokenGrant;

use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
    basic::{BasicClient, BasicTokenResponse},
};
use tracing::{debug, info};
use url::Url;

type UserOauth2Client =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

type PartnerOauth2Client =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Fleet OAuth provider endpoints: authorization-code, refresh-token and
/// client-credentials grants. The Fleet API base URL is sent as `audience`.
#[derive(Clone)]
pub struct FleetOauthClient {
    user: UserOauth2Client,
    partner: PartnerOauth2Client,
    http: reqwest::Client,
    audience: String,
    user_scopes: Vec<Scope>,
    partner_scopes: Vec<Scope>,
}

impl FleetOauthClient {
    pub fn new(cfg: &FleetConfig, http: reqwest::Client) -> Result<Self, GatewayError> {
        let mut user = BasicClient::new(ClientId::new(cfg.client_id.clone()))
            .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(AuthUrl::new(cfg.auth_url.clone())?)
            .set_token_uri(TokenUrl::new(cfg.token_url.clone())?);
        if !cfg.redirect_uri.is_empty() {
            user = user.set_redirect_uri(RedirectUrl::new(cfg.redirect_uri.clone())?);
        }

        let partner = BasicClient::new(ClientId::new(cfg.client_id.clone()))
            .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(TokenUrl::new(cfg.partner_token_url.clone())?);

        Ok(Self {
            user,
            partner,
            http,
            audience: cfg.api_base().to_string(),
            user_scopes: scopes(&cfg.user_scope),
            partner_scopes: scopes(&cfg.partner_scope),
        })
    }

    /// Consent page URL carrying `state` as the CSRF token.
    pub fn authorize_url(&self, state: CsrfToken) -> Url {
        let (url, _csrf) = self
            .user
            .authorize_url(move || state)
            .add_scopes(self.user_scopes.iter().cloned())
            .url();
        url
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, GatewayError> {
        let resp: BasicTokenResponse = self
            .user
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .add_extra_param("audience", self.audience.clone())
            .request_async(&self.http)
            .await?;
        info!("Authorization code exchanged successfully");
        Ok(into_grant(resp))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, GatewayError> {
        let resp: BasicTokenResponse = self
            .user
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http)
            .await?;
        debug!(
            rotated = resp.refresh_token().is_some(),
            "User access token refreshed"
        );
        Ok(into_grant(resp))
    }

    pub async fn client_credentials(&self) -> Result<TokenGrant, GatewayError> {
        let resp: BasicTokenResponse = self
            .partner
            .exchange_client_credentials()
            .add_scopes(self.partner_scopes.iter().cloned())
            .add_extra_param("audience", self.audience.clone())
            .request_async(&self.http)
            .await?;
        info!("Partner token fetched successfully");
        Ok(into_grant(resp))
    }
}

fn scopes(raw: &str) -> Vec<Scope> {
    raw.split_whitespace()
        .map(|s| Scope::new(s.to_string()))
        .collect()
}

fn into_grant(resp: BasicTokenResponse) -> TokenGrant {
    TokenGrant {
        access_token: resp.access_token().secret().clone(),
        refresh_token: resp
            .refresh_token()
            .map(|t| t.secret().clone())
            .filter(|t| !t.is_empty()),
        expires_in: resp.expires_in().filter(|d| !d.is_zero()),
    }
}
