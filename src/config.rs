use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::GatewayError;

/// Process-wide configuration, loaded once on first access.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| panic!("FATAL: failed to load configuration: {e}"))
});

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub jwt: JwtConfig,
    pub fleet: FleetConfig,
    pub command: CommandConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
    pub database_url: String,
    /// Outbound proxy for every upstream call.
    pub proxy: Option<url::Url>,
    /// Key material (64+ bytes) for the private login cookie; random per process when unset.
    pub cookie_secret: Option<String>,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            loglevel: "info".to_string(),
            database_url: "sqlite:data.db".to_string(),
            proxy: None,
            cookie_secret: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub expiration_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "fleet-gateway".to_string(),
            expiration_secs: 24 * 60 * 60,
        }
    }
}

impl JwtConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FleetConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub partner_token_url: String,
    pub partner_scope: String,
    pub partner_domain: String,
    pub user_scope: String,
    pub user_agent: String,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            auth_url: "https://auth.tesla.cn/oauth2/v3/authorize".to_string(),
            token_url: "https://auth.tesla.cn/oauth2/v3/token".to_string(),
            api_url: "https://fleet-api.prd.cn.vn.cloud.tesla.cn".to_string(),
            partner_token_url: "https://auth.tesla.cn/oauth2/v3/token".to_string(),
            partner_scope: "openid user_data vehicle_device_data vehicle_cmds vehicle_charging_cmds vehicle_location offline_access".to_string(),
            partner_domain: String::new(),
            user_scope: "openid offline_access user_data vehicle_device_data vehicle_cmds vehicle_charging_cmds".to_string(),
            user_agent: "fleet-gateway/0.1".to_string(),
        }
    }
}

impl FleetConfig {
    /// Fleet API base without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub session_cache_size: u64,
    /// Serialize refreshes per user instead of letting concurrent requests race.
    pub serialize_user_refresh: bool,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 20,
            session_cache_size: 1024,
            serialize_user_refresh: false,
        }
    }
}

impl CommandConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Config {
    /// Defaults, then `config.toml`, then `GATEWAY_*` environment variables.
    pub fn load() -> Result<Self, GatewayError> {
        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("GATEWAY_").split("__"))
            .extract()?;
        Ok(cfg)
    }
}
