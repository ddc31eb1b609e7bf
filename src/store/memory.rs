//! In-memory ledger store
//!
//! Process-local implementation of the store contracts. Each unit-of-work
//! reads from a private copy of the ledger taken at `begin` and buffers its
//! writes; `commit` validates and applies them in one step. Used by tests and
//! local tooling, and supports fault injection and artificial read latency to
//! exercise failure and race paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{Account, AccountBalanceSnapshot, AccountMovement};

use super::{
    AccountStore, MovementStore, Page, PageRequest, SnapshotStore, SortOrder, StoreError,
    StoreResult, TransactionManager, UnitOfWork,
};

/// How an injected fault manifests on movement reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// Return `StoreError::Unavailable`
    Error,
    /// Panic inside the store call
    Panic,
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: HashMap<Uuid, Account>,
    movements: Vec<AccountMovement>,
    snapshots: HashMap<Uuid, AccountBalanceSnapshot>,
}

impl LedgerState {
    fn has_period(&self, snapshot: &AccountBalanceSnapshot) -> bool {
        self.snapshots.values().any(|existing| {
            existing.id != snapshot.id
                && existing.account_id == snapshot.account_id
                && existing.is_for_period(snapshot.month, snapshot.year)
        })
    }

    fn apply(&mut self, write: PendingWrite) {
        match write {
            PendingWrite::Movement(movement) => self.movements.push(movement),
            PendingWrite::CreateSnapshot(snapshot) | PendingWrite::SaveSnapshot(snapshot) => {
                self.snapshots.insert(snapshot.id, snapshot);
            }
            PendingWrite::DeleteSnapshot(id) => {
                self.snapshots.remove(&id);
            }
        }
    }

    fn account_movements(&self, account_id: Uuid) -> Vec<AccountMovement> {
        let mut movements: Vec<AccountMovement> = self
            .movements
            .iter()
            .filter(|m| m.account_id() == account_id)
            .cloned()
            .collect();
        // stable sort keeps insertion order for equal timestamps
        movements.sort_by_key(|m| m.created_at());
        movements
    }
}

#[derive(Debug, Clone)]
enum PendingWrite {
    Movement(AccountMovement),
    CreateSnapshot(AccountBalanceSnapshot),
    SaveSnapshot(AccountBalanceSnapshot),
    DeleteSnapshot(Uuid),
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<LedgerState>,
    faults: Mutex<HashMap<Uuid, FaultMode>>,
    read_delay: Mutex<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared in-memory ledger; cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    shared: Arc<Shared>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, account: Account) {
        lock(&self.shared.state).accounts.insert(account.id, account);
    }

    /// Append a movement directly, bypassing validation (fixtures, imports)
    pub fn seed_movement(&self, movement: AccountMovement) {
        lock(&self.shared.state).movements.push(movement);
    }

    pub fn seed_snapshot(&self, snapshot: AccountBalanceSnapshot) {
        lock(&self.shared.state).snapshots.insert(snapshot.id, snapshot);
    }

    /// Committed movements of an account, oldest first
    pub fn movements(&self, account_id: Uuid) -> Vec<AccountMovement> {
        lock(&self.shared.state).account_movements(account_id)
    }

    pub fn snapshots(&self, account_id: Uuid) -> Vec<AccountBalanceSnapshot> {
        lock(&self.shared.state)
            .snapshots
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect()
    }

    /// Make movement reads for `account_id` fail until cleared
    pub fn inject_fault(&self, account_id: Uuid, mode: FaultMode) {
        lock(&self.shared.faults).insert(account_id, mode);
    }

    pub fn clear_faults(&self) {
        lock(&self.shared.faults).clear();
    }

    /// Delay applied to every movement read, widening race windows
    pub fn set_read_delay(&self, delay: Duration) {
        *lock(&self.shared.read_delay) = delay;
    }
}

#[async_trait]
impl TransactionManager for InMemoryLedger {
    type Work = InMemoryUnitOfWork;

    async fn begin(&self) -> StoreResult<InMemoryUnitOfWork> {
        let view = lock(&self.shared.state).clone();
        Ok(InMemoryUnitOfWork {
            shared: Arc::clone(&self.shared),
            view,
            writes: Vec::new(),
        })
    }
}

/// Unit-of-work over an [`InMemoryLedger`]
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    shared: Arc<Shared>,
    view: LedgerState,
    writes: Vec<PendingWrite>,
}

impl InMemoryUnitOfWork {
    async fn before_movement_read(&self, account_id: Uuid) -> StoreResult<()> {
        let delay = *lock(&self.shared.read_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let fault = lock(&self.shared.faults).get(&account_id).copied();
        match fault {
            Some(FaultMode::Error) => Err(StoreError::Unavailable(format!(
                "injected fault reading movements of {}",
                account_id
            ))),
            Some(FaultMode::Panic) => {
                panic!("injected panic reading movements of {}", account_id)
            }
            None => Ok(()),
        }
    }

    fn stage(&mut self, write: PendingWrite) {
        self.view.apply(write.clone());
        self.writes.push(write);
    }
}

#[async_trait]
impl AccountStore for InMemoryUnitOfWork {
    async fn find_account(&mut self, account_id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.view.accounts.get(&account_id).cloned())
    }

    async fn find_active_accounts(&mut self) -> StoreResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .view
            .accounts
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }
}

#[async_trait]
impl MovementStore for InMemoryUnitOfWork {
    async fn create_movement(&mut self, movement: &AccountMovement) -> StoreResult<()> {
        if self.view.movements.iter().any(|m| m.id() == movement.id()) {
            return Err(StoreError::Conflict(format!(
                "movement {} already exists",
                movement.id()
            )));
        }
        self.stage(PendingWrite::Movement(movement.clone()));
        Ok(())
    }

    async fn find_movement_by_id(&mut self, id: Uuid) -> StoreResult<Option<AccountMovement>> {
        Ok(self.view.movements.iter().find(|m| m.id() == id).cloned())
    }

    async fn find_movements(
        &mut self,
        account_id: Uuid,
        page: &PageRequest,
    ) -> StoreResult<Page<AccountMovement>> {
        self.before_movement_read(account_id).await?;

        let mut movements = self.view.account_movements(account_id);
        movements.reverse();
        let total = movements.len() as u64;
        let items = movements
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();

        Ok(Page::new(items, page, total))
    }

    async fn find_movements_by_account_id(
        &mut self,
        account_id: Uuid,
        order: SortOrder,
    ) -> StoreResult<Vec<AccountMovement>> {
        self.before_movement_read(account_id).await?;

        let mut movements = self.view.account_movements(account_id);
        if order == SortOrder::Desc {
            movements.reverse();
        }
        Ok(movements)
    }
}

#[async_trait]
impl SnapshotStore for InMemoryUnitOfWork {
    async fn create_snapshot(&mut self, snapshot: &AccountBalanceSnapshot) -> StoreResult<()> {
        if self.view.snapshots.contains_key(&snapshot.id) || self.view.has_period(snapshot) {
            return Err(StoreError::Conflict(format!(
                "snapshot for account {} {}/{} already exists",
                snapshot.account_id, snapshot.month, snapshot.year
            )));
        }
        self.stage(PendingWrite::CreateSnapshot(snapshot.clone()));
        Ok(())
    }

    async fn find_snapshot_by_period(
        &mut self,
        account_id: Uuid,
        month: u32,
        year: i32,
    ) -> StoreResult<Option<AccountBalanceSnapshot>> {
        Ok(self
            .view
            .snapshots
            .values()
            .find(|s| s.account_id == account_id && s.is_for_period(month, year))
            .cloned())
    }

    async fn find_latest_snapshot(
        &mut self,
        account_id: Uuid,
    ) -> StoreResult<Option<AccountBalanceSnapshot>> {
        Ok(self
            .view
            .snapshots
            .values()
            .filter(|s| s.account_id == account_id)
            .max_by_key(|s| s.period_key())
            .cloned())
    }

    async fn save_snapshot(&mut self, snapshot: &AccountBalanceSnapshot) -> StoreResult<()> {
        if self.view.has_period(snapshot) {
            return Err(StoreError::Conflict(format!(
                "snapshot for account {} {}/{} already exists",
                snapshot.account_id, snapshot.month, snapshot.year
            )));
        }
        self.stage(PendingWrite::SaveSnapshot(snapshot.clone()));
        Ok(())
    }

    async fn delete_snapshot(&mut self, id: Uuid) -> StoreResult<bool> {
        if !self.view.snapshots.contains_key(&id) {
            return Ok(false);
        }
        self.stage(PendingWrite::DeleteSnapshot(id));
        Ok(true)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self) -> StoreResult<()> {
        let mut state = lock(&self.shared.state);

        // Re-check uniqueness against writes committed since `begin`
        for write in &self.writes {
            if let PendingWrite::CreateSnapshot(snapshot) = write {
                if state.snapshots.contains_key(&snapshot.id) || state.has_period(snapshot) {
                    return Err(StoreError::Conflict(format!(
                        "snapshot for account {} {}/{} already exists",
                        snapshot.account_id, snapshot.month, snapshot.year
                    )));
                }
            }
        }

        for write in self.writes {
            state.apply(write);
        }
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}
