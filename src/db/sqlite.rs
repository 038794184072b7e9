use crate::db::CredentialStore;
use crate::db::models::DbUserToken;
use crate::db::schema::SQLITE_INIT;
use crate::error::GatewayError;
use crate::fleet_oauth::credentials::UserCredential;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct TokenStorage {
    pool: SqlitePool,
}

impl TokenStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), GatewayError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Upsert by unique user_id. `created_at` survives updates.
    pub async fn upsert_token(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let now = encode_ts(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO user_tokens (
                user_id, access_token, refresh_token, expires_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                access_token=excluded.access_token,
                refresh_token=excluded.refresh_token,
                expires_at=excluded.expires_at,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(user_id.to_string())
        .bind(access_token)
        .bind(refresh_token)
        .bind(encode_ts(expires_at))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        debug!(%user_id, "user token upserted");
        Ok(())
    }

    pub async fn get_by_user_id(&self, user_id: Uuid) -> Result<Option<DbUserToken>, GatewayError> {
        let row = sqlx::query(
            r#"SELECT user_id, access_token, refresh_token, expires_at, created_at, updated_at
               FROM user_tokens WHERE user_id = ?"#,
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_model).transpose()
    }

    fn row_to_model(row: SqliteRow) -> Result<DbUserToken, GatewayError> {
        let user_id: String = row.try_get("user_id")?;
        let access_token: String = row.try_get("access_token")?;
        let refresh_token: String = row.try_get("refresh_token")?;
        let expires_at: String = row.try_get("expires_at")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        let user_id = Uuid::parse_str(&user_id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(DbUserToken {
            user_id,
            access_token,
            refresh_token,
            expires_at: decode_ts(&expires_at)?,
            created_at: decode_ts(&created_at)?,
            updated_at: decode_ts(&updated_at)?,
        })
    }
}

#[async_trait]
impl CredentialStore for TokenStorage {
    async fn upsert(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        self.upsert_token(user_id, access_token, refresh_token, expires_at)
            .await
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<UserCredential>, GatewayError> {
        Ok(self.get_by_user_id(user_id).await?.map(Into::into))
    }
}

fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_ts(raw: &str) -> Result<DateTime<Utc>, GatewayError> {
    let ts = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        .with_timezone(&Utc);
    Ok(ts)
}
