//! SQL DDL for initializing the credential storage.

/// SQLite schema with:
/// - `user_id` TEXT PRIMARY KEY (one live row per user)
/// - timestamps stored as RFC3339 text with nanosecond precision
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS user_tokens (
    user_id TEXT PRIMARY KEY NOT NULL,
    access_token TEXT NOT NULL,
    refresh_token TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_user_tokens_expires_at ON user_tokens(expires_at);
"#;
