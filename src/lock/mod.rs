//! Distributed lock module
//!
//! Per-account mutual exclusion for the validate-then-append sequence.
//! Acquisition is bounded: a manager retries up to `max_attempts` times and
//! then reports failure instead of waiting indefinitely.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

pub use memory::InMemoryLockManager;
pub use postgres::PgLockManager;

/// Lock manager errors
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Lock backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait LockManager: Send + Sync + 'static {
    /// Try to take the lock; `Ok(false)` when still held elsewhere after all attempts
    async fn acquire(&self, key: &str) -> Result<bool, LockError>;

    async fn release(&self, key: &str) -> Result<(), LockError>;
}

/// Lock key serializing movements of one account
pub fn account_lock_key(account_id: Uuid) -> String {
    format!("account:{}", account_id)
}

/// Acquisition bounds and lease length
#[derive(Debug, Clone)]
pub struct LockSettings {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Lease after which an unreleased lock may be taken over
    pub ttl: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(50),
            ttl: Duration::from_secs(30),
        }
    }
}
