//! Wall clock abstraction
//!
//! Withdrawal policy and snapshot periods depend on the current time, so it
//! is injected rather than read from `Utc::now()` at every call site.
//!
//! Readings are truncated to microseconds, the precision of `TIMESTAMPTZ`,
//! so an instant compares the same before and after it is stored.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::sync::Mutex;

const STORED_SUBSEC_DIGITS: u16 = 6;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Drop precision the database cannot store
fn truncate_to_stored(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(STORED_SUBSEC_DIGITS)
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        truncate_to_stored(Utc::now())
    }
}

/// Manually driven clock, used by tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        truncate_to_stored(*self.now.lock().unwrap_or_else(|e| e.into_inner()))
    }
}
