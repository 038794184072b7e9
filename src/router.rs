use crate::api::{FleetApi, build_http_client};
use crate::config::Config;
use crate::db::CredentialStore;
use crate::error::GatewayError;
use crate::fleet_oauth::FleetOauthClient;
use crate::handlers::{command, login, partner, vehicle};
use crate::middleware::JwtIssuer;
use crate::service::command::{CommandDispatcher, VehicleTransport};
use crate::service::{PartnerTokenCache, ProxyPipeline, UserTokenManager};
use axum::{
    Json, Router,
    extract::FromRef,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct GatewayState {
    pub tokens: Arc<UserTokenManager>,
    pub proxy: ProxyPipeline,
    pub partner: Arc<PartnerTokenCache>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub fleet: FleetApi,
    pub jwt: JwtIssuer,
    pub partner_domain: String,
    pub commands_enabled: bool,
    key: Key,
}

impl GatewayState {
    /// Wire every component from `cfg`. Fails if the partner credential cannot be obtained.
    pub async fn build(
        cfg: &Config,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn VehicleTransport>,
    ) -> Result<Self, GatewayError> {
        let http = build_http_client(&cfg.basic, &cfg.fleet)?;
        let oauth = FleetOauthClient::new(&cfg.fleet, http.clone())?;
        let fleet = FleetApi::new(http, &cfg.fleet);
        let jwt = JwtIssuer::new(&cfg.jwt)?;

        let partner = PartnerTokenCache::new(
            oauth.clone(),
            fleet.clone(),
            cfg.fleet.partner_domain.clone(),
        )
        .await?;

        let tokens = Arc::new(UserTokenManager::new(
            store,
            oauth,
            cfg.command.serialize_user_refresh,
        ));
        let proxy = ProxyPipeline::new(tokens.clone(), fleet.clone());
        let dispatcher = Arc::new(CommandDispatcher::new(
            transport,
            &cfg.command,
            &cfg.fleet.user_agent,
        ));

        info!(
            api = %fleet.base_url(),
            commands_enabled = cfg.command.enabled,
            "gateway state initialised"
        );
        Ok(Self {
            tokens,
            proxy,
            partner: Arc::new(partner),
            dispatcher,
            fleet,
            jwt,
            partner_domain: cfg.fleet.partner_domain.clone(),
            commands_enabled: cfg.command.enabled,
            key: cookie_key(cfg.basic.cookie_secret.as_deref())?,
        })
    }
}

fn cookie_key(secret: Option<&str>) -> Result<Key, GatewayError> {
    match secret {
        None | Some("") => Ok(Key::generate()),
        Some(s) => Key::try_from(s.as_bytes()).map_err(|_| {
            GatewayError::Misconfigured("basic.cookie_secret must be at least 64 bytes".to_string())
        }),
    }
}

impl FromRef<GatewayState> for Key {
    fn from_ref(state: &GatewayState) -> Self {
        state.key.clone()
    }
}

impl FromRef<GatewayState> for JwtIssuer {
    fn from_ref(state: &GatewayState) -> Self {
        state.jwt.clone()
    }
}

pub fn gateway_router(state: GatewayState) -> Router {
    let mut router = Router::new()
        .route("/", get(|| async { Json(json!({"message": "ping"})) }))
        .route("/api/login", get(login::login_redirect))
        .route("/api/login/callback", get(login::login_callback))
        .route("/api/partner/public_key", get(partner::public_key))
        .route(
            "/api/partner/fleet_telemetry_errors",
            get(partner::fleet_telemetry_errors),
        )
        .route(
            "/api/vehicles/{vehicle_tag}/command/{*command_path}",
            post(command::vehicle_command),
        );

    for route in vehicle::FLEET_ROUTES {
        router = router.route(route.path, vehicle::method_router(route));
    }

    router.with_state(state)
}
