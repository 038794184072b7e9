use crate::db::CredentialStore;
use crate::error::GatewayError;
use crate::fleet_oauth::{FleetOauthClient, TokenGrant, UserCredential};
use crate::service::keyed_lock::KeyedLocks;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lead time the proxy pipeline uses before each upstream call.
pub fn proxy_lead_time() -> Duration {
    Duration::minutes(5)
}

/// Lifetime assumed when the provider omits `expires_in`.
pub fn default_token_lifetime() -> Duration {
    Duration::hours(1)
}

/// Per-user token lifecycle: load, proactive refresh, forced refresh, first exchange.
pub struct UserTokenManager {
    store: Arc<dyn CredentialStore>,
    oauth: FleetOauthClient,
    refresh_locks: Option<KeyedLocks>,
}

impl UserTokenManager {
    /// With `serialize_refresh`, concurrent refreshes for one user collapse into a single grant.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        oauth: FleetOauthClient,
        serialize_refresh: bool,
    ) -> Self {
        Self {
            store,
            oauth,
            refresh_locks: serialize_refresh.then(KeyedLocks::new),
        }
    }

    pub fn oauth(&self) -> &FleetOauthClient {
        &self.oauth
    }

    pub async fn load(&self, user_id: Uuid) -> Result<UserCredential, GatewayError> {
        self.store
            .get(user_id)
            .await?
            .ok_or_else(|| GatewayError::Unauthenticated("user token not found".to_string()))
    }

    /// Return `credential` untouched if it outlives `lead`, otherwise refresh it.
    pub async fn ensure_valid(
        &self,
        credential: UserCredential,
        lead: Duration,
    ) -> Result<UserCredential, GatewayError> {
        if credential.is_valid_at(Utc::now(), lead) {
            return Ok(credential);
        }
        debug!(user_id = %credential.user_id, expires_at = %credential.expires_at, "access token near expiry");
        self.refresh(&credential).await
    }

    /// Exchange the stored refresh token and persist the result before returning it.
    ///
    /// A missing refresh token in the reply keeps the old one. Nothing is written on failure.
    pub async fn refresh(&self, credential: &UserCredential) -> Result<UserCredential, GatewayError> {
        let Some(locks) = self.refresh_locks.as_ref() else {
            return self.refresh_unlocked(credential).await;
        };

        let _guard = locks.lock(&credential.user_id.to_string()).await;
        if let Some(stored) = self.store.get(credential.user_id).await? {
            if stored.access_token != credential.access_token
                && stored.is_valid_at(Utc::now(), Duration::zero())
            {
                debug!(user_id = %credential.user_id, "token already refreshed by a concurrent request");
                return Ok(stored);
            }
        }
        self.refresh_unlocked(credential).await
    }

    async fn refresh_unlocked(
        &self,
        credential: &UserCredential,
    ) -> Result<UserCredential, GatewayError> {
        let grant = self
            .oauth
            .refresh(&credential.refresh_token)
            .await
            .inspect_err(|e| warn!(user_id = %credential.user_id, error = %e, "token refresh failed"))?;

        let refreshed = UserCredential {
            user_id: credential.user_id,
            expires_at: grant.expires_at(Utc::now(), default_token_lifetime()),
            refresh_token: grant
                .refresh_token
                .unwrap_or_else(|| credential.refresh_token.clone()),
            access_token: grant.access_token,
        };
        self.persist(&refreshed).await?;
        info!(user_id = %refreshed.user_id, expires_at = %refreshed.expires_at, "user token refreshed");
        Ok(refreshed)
    }

    /// First-time exchange of an authorization code for `user_id`.
    pub async fn exchange_code(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<UserCredential, GatewayError> {
        let grant = self.oauth.exchange_code(code).await?;
        let credential = self.credential_from_grant(user_id, grant)?;
        self.persist(&credential).await?;
        info!(%user_id, "user token stored");
        Ok(credential)
    }

    fn credential_from_grant(
        &self,
        user_id: Uuid,
        grant: TokenGrant,
    ) -> Result<UserCredential, GatewayError> {
        let refresh_token = grant.refresh_token.clone().ok_or_else(|| {
            GatewayError::Oauth2Token("provider returned no refresh token".to_string())
        })?;
        Ok(UserCredential {
            user_id,
            expires_at: grant.expires_at(Utc::now(), default_token_lifetime()),
            access_token: grant.access_token,
            refresh_token,
        })
    }

    async fn persist(&self, credential: &UserCredential) -> Result<(), GatewayError> {
        self.store
            .upsert(
                credential.user_id,
                &credential.access_token,
                &credential.refresh_token,
                credential.expires_at,
            )
            .await
    }
}
