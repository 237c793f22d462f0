use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::error::AppResult;

/// RevocationStore
///
/// Remembers token ids (`jti`) that were logged out before their natural expiry.
/// An entry only needs to outlive the token it blocks, so stores may drop
/// entries whose `expires_at` has passed.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> AppResult<()>;
    async fn is_revoked(&self, jti: &str) -> AppResult<bool>;
    /// Drops expired entries and returns how many were removed.
    async fn purge_expired(&self) -> AppResult<u64>;
}

pub type RevocationState = Arc<dyn RevocationStore>;

/// PostgresRevocationStore
///
/// Backed by the `revoked_tokens` table, so logouts survive restarts and are shared
/// between instances.
pub struct PostgresRevocationStore {
    pool: PgPool,
}

impl PostgresRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PostgresRevocationStore {
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        let found = sqlx::query_scalar::<_, String>("SELECT jti FROM revoked_tokens WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn purge_expired(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// InMemoryRevocationStore
///
/// Process-local store for tests and single-instance local runs.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
        self.revoked
            .write()
            .await
            .insert(jti.to_string(), expires_at);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        Ok(self.revoked.read().await.contains_key(jti))
    }

    async fn purge_expired(&self) -> AppResult<u64> {
        let now = Utc::now();
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, expires_at| *expires_at >= now);
        Ok((before - revoked.len()) as u64)
    }
}
