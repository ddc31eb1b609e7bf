//! Balance Reconstructor
//!
//! Current balance = latest snapshot balance + signed sum of movements created
//! since that snapshot was taken. Without a snapshot the whole ledger is
//! replayed from zero, which is slower but never wrong.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{AccountBalanceSnapshot, AccountMovement, Balance};
use crate::store::{MovementStore, SnapshotStore, SortOrder, StoreResult};

/// Latest snapshot plus the movements of one account
#[derive(Debug, Clone)]
pub struct LedgerView {
    pub snapshot: Option<AccountBalanceSnapshot>,
    pub movements: Vec<AccountMovement>,
}

impl LedgerView {
    /// Load the latest snapshot and all movements of `account_id`
    pub async fn load<S>(store: &mut S, account_id: Uuid) -> StoreResult<Self>
    where
        S: MovementStore + SnapshotStore + ?Sized,
    {
        let snapshot = store.find_latest_snapshot(account_id).await?;
        let movements = store
            .find_movements_by_account_id(account_id, SortOrder::Asc)
            .await?;

        Ok(Self {
            snapshot,
            movements,
        })
    }

    /// Instant from which movements are not yet folded into the snapshot
    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.snapshot.as_ref().map(|s| s.snapshot_timestamp)
    }

    /// Reconstructed balance as of `now`.
    ///
    /// Movements before the anchor are already part of the snapshot balance;
    /// movements after `now` are not yet visible.
    pub fn balance_at(&self, now: DateTime<Utc>) -> Balance {
        let base = self
            .snapshot
            .as_ref()
            .map(|s| s.balance)
            .unwrap_or_default();
        let anchor = self.anchor();

        self.movements
            .iter()
            .filter(|m| anchor.map_or(true, |a| m.created_at() >= a))
            .filter(|m| m.created_at() <= now)
            .fold(base, |balance, m| m.apply_to(balance))
    }

    /// Total of DEBIT movements created in `[start, end)`
    pub fn debit_total_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
        self.movements
            .iter()
            .filter(|m| m.is_debit())
            .filter(|m| m.created_at() >= start && m.created_at() < end)
            .map(|m| m.amount().value())
            .sum()
    }
}

/// Reconstruct the balance of `account_id` as of `now`
pub async fn current_balance<S>(
    store: &mut S,
    account_id: Uuid,
    now: DateTime<Utc>,
) -> StoreResult<Balance>
where
    S: MovementStore + SnapshotStore + ?Sized,
{
    let view = LedgerView::load(store, account_id).await?;
    Ok(view.balance_at(now))
}

/// Fold movements from zero, oldest first, returning the balance and the
/// last movement folded
pub fn replay(movements: &[AccountMovement]) -> (Balance, Option<&AccountMovement>) {
    let balance = movements
        .iter()
        .fold(Balance::zero(), |balance, m| m.apply_to(balance));
    let last = movements.iter().max_by_key(|m| m.created_at());
    (balance, last)
}
