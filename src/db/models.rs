use crate::fleet_oauth::credentials::UserCredential;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbUserToken {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbUserToken> for UserCredential {
    fn from(d: DbUserToken) -> Self {
        UserCredential {
            user_id: d.user_id,
            access_token: d.access_token,
            refresh_token: d.refresh_token,
            expires_at: d.expires_at,
        }
    }
}
