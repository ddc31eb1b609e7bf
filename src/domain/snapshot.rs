//! Account Balance Snapshot
//!
//! Checkpoint of an account's cumulative balance for a calendar month.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Balance;

/// Checkpoint balance for one (account, month, year).
///
/// `snapshot_timestamp` is the instant the balance was computed; movements
/// created at or after it are folded on top of `balance` during
/// reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalanceSnapshot {
    pub id: Uuid,
    pub account_id: Uuid,
    pub balance: Balance,
    pub month: u32,
    pub year: i32,
    pub snapshot_timestamp: DateTime<Utc>,
    pub last_transaction_id: Option<Uuid>,
    pub last_transaction_timestamp: DateTime<Utc>,
}

impl AccountBalanceSnapshot {
    /// Build a snapshot for the given period.
    ///
    /// When no movement was folded, `last_transaction_timestamp` falls back to
    /// the snapshot's own timestamp.
    pub fn new(
        account_id: Uuid,
        balance: Balance,
        month: u32,
        year: i32,
        snapshot_timestamp: DateTime<Utc>,
        last_transaction: Option<(Uuid, DateTime<Utc>)>,
    ) -> Self {
        let (last_transaction_id, last_transaction_timestamp) = match last_transaction {
            Some((id, at)) => (Some(id), at),
            None => (None, snapshot_timestamp),
        };

        Self {
            id: Uuid::new_v4(),
            account_id,
            balance,
            month,
            year,
            snapshot_timestamp,
            last_transaction_id,
            last_transaction_timestamp,
        }
    }

    /// Key used to order snapshots chronologically
    pub fn period_key(&self) -> (i32, u32) {
        (self.year, self.month)
    }

    pub fn is_for_period(&self, month: u32, year: i32) -> bool {
        self.month == month && self.year == year
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_without_movements_uses_own_timestamp() {
        let taken_at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 5, 0).unwrap();
        let snapshot =
            AccountBalanceSnapshot::new(Uuid::new_v4(), Balance::zero(), 3, 2026, taken_at, None);

        assert!(snapshot.last_transaction_id.is_none());
        assert_eq!(snapshot.last_transaction_timestamp, taken_at);
    }

    #[test]
    fn test_snapshot_period_ordering() {
        let now = Utc::now();
        let december =
            AccountBalanceSnapshot::new(Uuid::new_v4(), Balance::new(dec!(1)), 12, 2025, now, None);
        let january =
            AccountBalanceSnapshot::new(Uuid::new_v4(), Balance::new(dec!(1)), 1, 2026, now, None);

        assert!(january.period_key() > december.period_key());
        assert!(january.is_for_period(1, 2026));
        assert!(!january.is_for_period(1, 2025));
    }
}
