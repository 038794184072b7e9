//! Database module: models and schema for persistent credential storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the `CredentialStore` implementation backed by SQLite

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::DbUserToken;
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, TokenStorage};

use crate::error::GatewayError;
use crate::fleet_oauth::credentials::UserCredential;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Durable per-user credential storage. `upsert` is insert-or-replace keyed by user id.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn upsert(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), GatewayError>;

    async fn get(&self, user_id: Uuid) -> Result<Option<UserCredential>, GatewayError>;
}

/// Open (creating if missing) the SQLite database and apply the schema.
pub async fn connect(database_url: &str) -> Result<TokenStorage, GatewayError> {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;

    let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    let storage = TokenStorage::new(pool);
    storage.init_schema().await?;
    Ok(storage)
}
