//! In-process lock manager
//!
//! Holds keys in a shared set. An optional acquisition delay simulates the
//! round trip of a remote lock service.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{LockError, LockManager, LockSettings};

#[derive(Debug, Default)]
pub struct InMemoryLockManager {
    held: Mutex<HashSet<String>>,
    settings: LockSettings,
    acquire_delay: Duration,
    fail_release: AtomicBool,
    releases: AtomicU64,
}

impl InMemoryLockManager {
    pub fn new(settings: LockSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    /// Make every `release` report an error (the key is still freed)
    pub fn set_fail_release(&self, fail: bool) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held_keys().contains(key)
    }

    /// Number of release calls observed
    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }

    fn held_keys(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_take(&self, key: &str) -> bool {
        self.held_keys().insert(key.to_string())
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn acquire(&self, key: &str) -> Result<bool, LockError> {
        if !self.acquire_delay.is_zero() {
            tokio::time::sleep(self.acquire_delay).await;
        }

        let attempts = self.settings.max_attempts.max(1);
        for attempt in 1..=attempts {
            if self.try_take(key) {
                return Ok(true);
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }

        tracing::debug!(lock_key = %key, attempts, "Lock still held after all attempts");
        Ok(false)
    }

    async fn release(&self, key: &str) -> Result<(), LockError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.held_keys().remove(key);

        if self.fail_release.load(Ordering::SeqCst) {
            return Err(LockError::Unavailable(format!(
                "release of {} could not be confirmed",
                key
            )));
        }
        Ok(())
    }
}
