//! PostgreSQL lock manager
//!
//! One row per held key in `ledger_locks`. A row whose lease has expired can
//! be taken over, so a crashed holder cannot block an account forever.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{LockError, LockManager, LockSettings};

#[derive(Debug, Clone)]
pub struct PgLockManager {
    pool: PgPool,
    /// Identifies locks taken by this process
    owner_id: Uuid,
    settings: LockSettings,
}

impl PgLockManager {
    pub fn new(pool: PgPool, settings: LockSettings) -> Self {
        Self {
            pool,
            owner_id: Uuid::new_v4(),
            settings,
        }
    }

    async fn try_acquire(&self, key: &str) -> Result<bool, LockError> {
        let acquired: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO ledger_locks (lock_key, owner_id, acquired_at, expires_at)
            VALUES ($1, $2, NOW(), NOW() + make_interval(secs => $3))
            ON CONFLICT (lock_key) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                acquired_at = EXCLUDED.acquired_at,
                expires_at = EXCLUDED.expires_at
            WHERE ledger_locks.expires_at < NOW()
            RETURNING owner_id
            "#,
        )
        .bind(key)
        .bind(self.owner_id)
        .bind(self.settings.ttl.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(acquired.is_some())
    }
}

#[async_trait]
impl LockManager for PgLockManager {
    async fn acquire(&self, key: &str) -> Result<bool, LockError> {
        let attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=attempts {
            if self.try_acquire(key).await? {
                return Ok(true);
            }
            if attempt < attempts {
                tracing::debug!(lock_key = %key, attempt, "Lock busy, retrying");
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }

        Ok(false)
    }

    async fn release(&self, key: &str) -> Result<(), LockError> {
        let result = sqlx::query("DELETE FROM ledger_locks WHERE lock_key = $1 AND owner_id = $2")
            .bind(key)
            .bind(self.owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(lock_key = %key, "Released lock was no longer held (lease expired?)");
        }
        Ok(())
    }
}
