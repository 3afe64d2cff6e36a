//! Revocation ledger: the denylist of token IDs that must be rejected even
//! though they still verify cryptographically.
//!
//! Entries live until the token's own expiry passes, at which point the
//! sweep deletes them. Lookups fail closed: if the ledger cannot answer,
//! the token is reported revoked.

use sqlx::sqlite::SqlitePool;
use tracing::error;

use crate::token::unix_now;

pub struct RevocationStore {
    pool: SqlitePool,
}

impl RevocationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Revoke a token ID until the given expiry. Idempotent: revoking an
    /// already-revoked ID is not an error.
    pub async fn revoke(&self, token_id: &str, expires_at: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO revoked_tokens (token_id, expiration) VALUES (?, ?) ON CONFLICT(token_id) DO NOTHING",
        )
        .bind(token_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Revoke inside the caller's transaction. Used by the one-time token
    /// consumption flows, where the revocation must commit or roll back
    /// together with the domain mutation.
    pub async fn revoke_in_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        token_id: &str,
        expires_at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO revoked_tokens (token_id, expiration) VALUES (?, ?) ON CONFLICT(token_id) DO NOTHING",
        )
        .bind(token_id)
        .bind(expires_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Check whether a token ID is revoked.
    ///
    /// Fail-closed: a ledger that cannot be read answers `true`. A false
    /// "not revoked" is a security hole; a false "revoked" costs the user
    /// a re-login.
    pub async fn is_revoked(&self, token_id: &str) -> bool {
        let row: Result<Option<(i64,)>, sqlx::Error> =
            sqlx::query_as("SELECT 1 FROM revoked_tokens WHERE token_id = ?")
                .bind(token_id)
                .fetch_optional(&self.pool)
                .await;

        match row {
            Ok(row) => row.is_some(),
            Err(e) => {
                error!(error = %e, "Revocation lookup failed, treating token as revoked");
                true
            }
        }
    }

    /// Delete all entries whose expiry has passed. Returns the number of
    /// rows removed. Safe to run concurrently with lookups.
    pub async fn sweep(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expiration < ?")
            .bind(unix_now() as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
