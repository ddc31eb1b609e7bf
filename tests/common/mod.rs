//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use account_ledger::api::AppState;
use account_ledger::balance::BalanceValidator;
use account_ledger::domain::{Account, AccountMovement, Amount, FixedClock, MovementType};
use account_ledger::handlers::{CreateMovementHandler, LedgerQueries};
use account_ledger::jobs::SnapshotGenerator;
use account_ledger::lock::{InMemoryLockManager, LockSettings};
use account_ledger::store::InMemoryLedger;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Wednesday 2026-01-14 10:00 UTC, inside weekday business hours
pub fn business_hours() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 14, 10, 0, 0).unwrap()
}

/// In-memory ledger wired the same way the binary wires PostgreSQL
pub struct TestLedger {
    pub ledger: InMemoryLedger,
    pub locks: Arc<InMemoryLockManager>,
    pub clock: Arc<FixedClock>,
    pub business_id: Uuid,
}

impl TestLedger {
    pub fn new(lock_settings: LockSettings) -> Self {
        Self::with_lock_delay(lock_settings, Duration::ZERO)
    }

    /// Lock manager that waits `delay` before acquiring, like a remote lock service
    pub fn with_lock_delay(lock_settings: LockSettings, delay: Duration) -> Self {
        Self {
            ledger: InMemoryLedger::new(),
            locks: Arc::new(InMemoryLockManager::new(lock_settings).with_acquire_delay(delay)),
            clock: Arc::new(FixedClock::new(business_hours())),
            business_id: Uuid::new_v4(),
        }
    }

    /// Create an active account owned by `self.business_id`
    pub fn open_account(&self) -> Uuid {
        let account = Account::new(Uuid::new_v4(), self.business_id, "test account");
        let id = account.id;
        self.ledger.insert_account(account);
        id
    }

    /// Seed a credit a month before the fixed clock
    pub fn fund(&self, account_id: Uuid, amount: i64) {
        self.ledger.seed_movement(AccountMovement::new(
            account_id,
            MovementType::Credit,
            Amount::from_integer(amount).unwrap(),
            Some("opening balance".to_string()),
            business_hours() - chrono::Duration::days(30),
        ));
    }

    pub fn handler(&self) -> CreateMovementHandler<InMemoryLedger, InMemoryLockManager> {
        CreateMovementHandler::new(
            Arc::new(self.ledger.clone()),
            Arc::clone(&self.locks),
            BalanceValidator::default(),
            self.clock.clone(),
        )
    }

    pub fn app_state(&self) -> AppState<InMemoryLedger, InMemoryLockManager> {
        let transactions = Arc::new(self.ledger.clone());
        AppState {
            movements: self.handler(),
            queries: LedgerQueries::new(
                Arc::clone(&transactions),
                BalanceValidator::default(),
                self.clock.clone(),
            ),
            snapshots: SnapshotGenerator::new(
                transactions,
                Default::default(),
                self.clock.clone(),
            ),
        }
    }
}
