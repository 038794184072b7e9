use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's Fleet API credential pair as persisted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredential {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl UserCredential {
    /// True when the credential is still valid `lead_time` from `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, lead_time: Duration) -> bool {
        now + lead_time < self.expires_at
    }
}

/// Result of any token grant against the OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<std::time::Duration>,
}

impl TokenGrant {
    /// Expiry instant for this grant, `fallback` is used when the provider omitted a lifetime.
    pub fn expires_at(&self, now: DateTime<Utc>, fallback: Duration) -> DateTime<Utc> {
        self.expires_in
            .and_then(|d| Duration::from_std(d).ok())
            .map(|d| now + d)
            .unwrap_or(now + fallback)
    }
}
