//! Persistence module
//!
//! Narrow store contracts consumed by the ledger, the unit-of-work that makes
//! them atomic, and the PostgreSQL and in-memory implementations.

mod error;
pub mod memory;
mod page;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Account, AccountBalanceSnapshot, AccountMovement};

pub use error::{StoreError, StoreResult};
pub use memory::{FaultMode, InMemoryLedger, InMemoryUnitOfWork};
pub use page::{Page, PageRequest, SortOrder};
pub use postgres::{PgTransactionManager, PgUnitOfWork};

/// Read access to externally owned accounts
#[async_trait]
pub trait AccountStore: Send {
    async fn find_account(&mut self, account_id: Uuid) -> StoreResult<Option<Account>>;

    async fn find_active_accounts(&mut self) -> StoreResult<Vec<Account>>;
}

/// Append log of movements
#[async_trait]
pub trait MovementStore: Send {
    async fn create_movement(&mut self, movement: &AccountMovement) -> StoreResult<()>;

    async fn find_movement_by_id(&mut self, id: Uuid) -> StoreResult<Option<AccountMovement>>;

    /// Newest-first page of an account's movements
    async fn find_movements(
        &mut self,
        account_id: Uuid,
        page: &PageRequest,
    ) -> StoreResult<Page<AccountMovement>>;

    async fn find_movements_by_account_id(
        &mut self,
        account_id: Uuid,
        order: SortOrder,
    ) -> StoreResult<Vec<AccountMovement>>;
}

/// Monthly balance checkpoints
#[async_trait]
pub trait SnapshotStore: Send {
    /// Insert a new snapshot. Fails with `StoreError::Conflict` when the
    /// account already has one for the same period.
    async fn create_snapshot(&mut self, snapshot: &AccountBalanceSnapshot) -> StoreResult<()>;

    async fn find_snapshot_by_period(
        &mut self,
        account_id: Uuid,
        month: u32,
        year: i32,
    ) -> StoreResult<Option<AccountBalanceSnapshot>>;

    async fn find_latest_snapshot(
        &mut self,
        account_id: Uuid,
    ) -> StoreResult<Option<AccountBalanceSnapshot>>;

    /// Insert or replace a snapshot by id
    async fn save_snapshot(&mut self, snapshot: &AccountBalanceSnapshot) -> StoreResult<()>;

    /// Returns whether a snapshot was removed
    async fn delete_snapshot(&mut self, id: Uuid) -> StoreResult<bool>;
}

/// Everything the ledger reads and writes
pub trait LedgerStore: AccountStore + MovementStore + SnapshotStore {}

impl<T: AccountStore + MovementStore + SnapshotStore> LedgerStore for T {}

/// Atomic scope over the ledger stores.
///
/// Dropping a unit-of-work without committing discards its writes.
#[async_trait]
pub trait UnitOfWork: LedgerStore {
    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

/// Opens units of work
#[async_trait]
pub trait TransactionManager: Send + Sync + 'static {
    type Work: UnitOfWork + 'static;

    async fn begin(&self) -> StoreResult<Self::Work>;
}
