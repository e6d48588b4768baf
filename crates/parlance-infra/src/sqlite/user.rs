//! SQLite user records and opaque token issuance.
//!
//! Identity is deliberately thin: a user row pairs a username with the
//! SHA-256 hash of an opaque bearer token. The plaintext token is returned
//! exactly once at creation and never stored.

use chrono::Utc;
use parlance_types::error::StoreError;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::Row;
use tracing::warn;
use uuid::Uuid;

use super::pool::DatabasePool;

/// Prefix on issued tokens, so they are recognizable in configs and logs.
const TOKEN_PREFIX: &str = "plc_";

/// A freshly created user together with its plaintext token.
///
/// This is the only moment the plaintext token exists; print it or lose it.
pub struct IssuedUser {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

/// SQLite-backed user lookup and creation.
pub struct SqliteUserStore {
    pool: DatabasePool,
}

impl SqliteUserStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Create a user and issue its bearer token.
    pub async fn create_user(&self, username: &str) -> Result<IssuedUser, StoreError> {
        let user_id = Uuid::now_v7();
        let token = generate_token();

        let result = sqlx::query(
            "INSERT INTO users (id, username, token_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id.to_string())
        .bind(username)
        .bind(hash_token(&token))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await;

        if let Err(e) = result {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                return Err(StoreError::Query(format!(
                    "username '{username}' already exists"
                )));
            }
            return Err(StoreError::Query(e.to_string()));
        }

        Ok(IssuedUser {
            user_id,
            username: username.to_string(),
            token,
        })
    }

    /// Resolve a presented bearer token to a user id.
    ///
    /// Returns `None` for unknown tokens. On a hit the user's `last_seen_at`
    /// is bumped best-effort; a failed bump never fails authentication.
    pub async fn authenticate(&self, token: &str) -> Result<Option<Uuid>, StoreError> {
        let token_hash = hash_token(token);

        let row = sqlx::query("SELECT id FROM users WHERE token_hash = ?")
            .bind(&token_hash)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id").map_err(|e| StoreError::Query(e.to_string()))?;
        let user_id =
            Uuid::parse_str(&id).map_err(|e| StoreError::Query(format!("invalid user id: {e}")))?;

        let touched = sqlx::query("UPDATE users SET last_seen_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(&id)
            .execute(&self.pool.writer)
            .await;
        if let Err(e) = touched {
            warn!(user_id = %user_id, error = %e, "failed to update last_seen_at");
        }

        Ok(Some(user_id))
    }
}

/// SHA-256 hex digest of a token, as stored in `users.token_hash`.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Generate a `plc_`-prefixed token with 256 bits of entropy.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{TOKEN_PREFIX}{hex}")
}
