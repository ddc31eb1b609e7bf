//! PostgreSQL ledger store
//!
//! Every unit-of-work wraps one sqlx transaction; all store calls made through
//! it run on that transaction's connection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Account, AccountBalanceSnapshot, AccountMovement, Amount, Balance};

use super::{
    AccountStore, MovementStore, Page, PageRequest, SnapshotStore, SortOrder, StoreError,
    StoreResult, TransactionManager, UnitOfWork,
};

type AccountRow = (Uuid, Uuid, String, bool, DateTime<Utc>);

type MovementRow = (
    Uuid,
    Uuid,
    String,
    Decimal,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

type SnapshotRow = (
    Uuid,
    Uuid,
    Decimal,
    i32,
    i32,
    DateTime<Utc>,
    Option<Uuid>,
    DateTime<Utc>,
);

const MOVEMENT_COLUMNS: &str =
    "id, account_id, movement_type, amount, description, created_at, updated_at";

const SNAPSHOT_COLUMNS: &str = "id, account_id, balance, month, year, snapshot_timestamp, \
     last_transaction_id, last_transaction_timestamp";

fn account_from_row(row: AccountRow) -> Account {
    let (id, business_id, name, is_active, created_at) = row;
    Account {
        id,
        business_id,
        name,
        is_active,
        created_at,
    }
}

fn movement_from_row(row: MovementRow) -> StoreResult<AccountMovement> {
    let (id, account_id, movement_type, amount, description, created_at, updated_at) = row;

    let movement_type = movement_type
        .parse()
        .map_err(|e: String| StoreError::InvalidData(format!("movement {}: {}", id, e)))?;
    let amount = Amount::new(amount)
        .map_err(|e| StoreError::InvalidData(format!("movement {}: {}", id, e)))?;

    Ok(AccountMovement::from_stored(
        id,
        account_id,
        movement_type,
        amount,
        description,
        created_at,
        updated_at,
    ))
}

fn snapshot_from_row(row: SnapshotRow) -> StoreResult<AccountBalanceSnapshot> {
    let (
        id,
        account_id,
        balance,
        month,
        year,
        snapshot_timestamp,
        last_transaction_id,
        last_transaction_timestamp,
    ) = row;

    let month = u32::try_from(month)
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| StoreError::InvalidData(format!("snapshot {}: month {}", id, month)))?;

    Ok(AccountBalanceSnapshot {
        id,
        account_id,
        balance: Balance::new(balance),
        month,
        year,
        snapshot_timestamp,
        last_transaction_id,
        last_transaction_timestamp,
    })
}

/// Opens PostgreSQL-backed units of work
#[derive(Debug, Clone)]
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    type Work = PgUnitOfWork;

    async fn begin(&self) -> StoreResult<PgUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }
}

/// Unit-of-work backed by a database transaction.
///
/// Dropping it without `commit` rolls the transaction back.
#[derive(Debug)]
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccountStore for PgUnitOfWork {
    async fn find_account(&mut self, account_id: Uuid) -> StoreResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, business_id, name, is_active, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(account_from_row))
    }

    async fn find_active_accounts(&mut self) -> StoreResult<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT id, business_id, name, is_active, created_at
            FROM accounts
            WHERE is_active = true
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(account_from_row).collect())
    }
}

#[async_trait]
impl MovementStore for PgUnitOfWork {
    async fn create_movement(&mut self, movement: &AccountMovement) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO account_movements
                (id, account_id, movement_type, amount, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(movement.id())
        .bind(movement.account_id())
        .bind(movement.movement_type().as_str())
        .bind(movement.amount().value())
        .bind(movement.description())
        .bind(movement.created_at())
        .bind(movement.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::from_insert(e, "movement"))?;

        Ok(())
    }

    async fn find_movement_by_id(&mut self, id: Uuid) -> StoreResult<Option<AccountMovement>> {
        let sql = format!("SELECT {} FROM account_movements WHERE id = $1", MOVEMENT_COLUMNS);
        let row: Option<MovementRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(movement_from_row).transpose()
    }

    async fn find_movements(
        &mut self,
        account_id: Uuid,
        page: &PageRequest,
    ) -> StoreResult<Page<AccountMovement>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM account_movements WHERE account_id = $1")
                .bind(account_id)
                .fetch_one(&mut *self.tx)
                .await?;

        let sql = format!(
            r#"
            SELECT {} FROM account_movements
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            MOVEMENT_COLUMNS
        );
        let rows: Vec<MovementRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(i64::from(page.limit()))
            .bind(page.offset() as i64)
            .fetch_all(&mut *self.tx)
            .await?;

        let items = rows
            .into_iter()
            .map(movement_from_row)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Page::new(items, page, total.max(0) as u64))
    }

    async fn find_movements_by_account_id(
        &mut self,
        account_id: Uuid,
        order: SortOrder,
    ) -> StoreResult<Vec<AccountMovement>> {
        let sql = format!(
            "SELECT {} FROM account_movements WHERE account_id = $1 ORDER BY created_at {}",
            MOVEMENT_COLUMNS,
            order.as_sql()
        );
        let rows: Vec<MovementRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(movement_from_row).collect()
    }
}

#[async_trait]
impl SnapshotStore for PgUnitOfWork {
    async fn create_snapshot(&mut self, snapshot: &AccountBalanceSnapshot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO account_balance_snapshots
                (id, account_id, balance, month, year, snapshot_timestamp,
                 last_transaction_id, last_transaction_timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(snapshot.id)
        .bind(snapshot.account_id)
        .bind(snapshot.balance.value())
        .bind(snapshot.month as i32)
        .bind(snapshot.year)
        .bind(snapshot.snapshot_timestamp)
        .bind(snapshot.last_transaction_id)
        .bind(snapshot.last_transaction_timestamp)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::from_insert(e, "snapshot for period"))?;

        Ok(())
    }

    async fn find_snapshot_by_period(
        &mut self,
        account_id: Uuid,
        month: u32,
        year: i32,
    ) -> StoreResult<Option<AccountBalanceSnapshot>> {
        let sql = format!(
            "SELECT {} FROM account_balance_snapshots \
             WHERE account_id = $1 AND month = $2 AND year = $3",
            SNAPSHOT_COLUMNS
        );
        let row: Option<SnapshotRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .bind(month as i32)
            .bind(year)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(snapshot_from_row).transpose()
    }

    async fn find_latest_snapshot(
        &mut self,
        account_id: Uuid,
    ) -> StoreResult<Option<AccountBalanceSnapshot>> {
        let sql = format!(
            "SELECT {} FROM account_balance_snapshots \
             WHERE account_id = $1 ORDER BY year DESC, month DESC LIMIT 1",
            SNAPSHOT_COLUMNS
        );
        let row: Option<SnapshotRow> = sqlx::query_as(&sql)
            .bind(account_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.map(snapshot_from_row).transpose()
    }

    async fn save_snapshot(&mut self, snapshot: &AccountBalanceSnapshot) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO account_balance_snapshots
                (id, account_id, balance, month, year, snapshot_timestamp,
                 last_transaction_id, last_transaction_timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                balance = EXCLUDED.balance,
                month = EXCLUDED.month,
                year = EXCLUDED.year,
                snapshot_timestamp = EXCLUDED.snapshot_timestamp,
                last_transaction_id = EXCLUDED.last_transaction_id,
                last_transaction_timestamp = EXCLUDED.last_transaction_timestamp
            "#,
        )
        .bind(snapshot.id)
        .bind(snapshot.account_id)
        .bind(snapshot.balance.value())
        .bind(snapshot.month as i32)
        .bind(snapshot.year)
        .bind(snapshot.snapshot_timestamp)
        .bind(snapshot.last_transaction_id)
        .bind(snapshot.last_transaction_timestamp)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::from_insert(e, "snapshot for period"))?;

        Ok(())
    }

    async fn delete_snapshot(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM account_balance_snapshots WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_movement_from_row() {
        let id = Uuid::new_v4();
        let row: MovementRow = (
            id,
            Uuid::new_v4(),
            "DEBIT".to_string(),
            dec!(25.50),
            Some("atm".to_string()),
            Utc::now(),
            None,
        );

        let movement = movement_from_row(row).unwrap();
        assert_eq!(movement.id(), id);
        assert!(movement.is_debit());
        assert_eq!(movement.amount().value(), dec!(25.5));
    }

    #[test]
    fn test_movement_from_row_rejects_bad_data() {
        let bad_type: MovementRow = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            "REFUND".to_string(),
            dec!(1),
            None,
            Utc::now(),
            None,
        );
        assert!(matches!(
            movement_from_row(bad_type),
            Err(StoreError::InvalidData(_))
        ));

        let negative: MovementRow = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            "CREDIT".to_string(),
            dec!(-1),
            None,
            Utc::now(),
            None,
        );
        assert!(matches!(
            movement_from_row(negative),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn test_snapshot_from_row_validates_month() {
        let now = Utc::now();
        let row: SnapshotRow = (Uuid::new_v4(), Uuid::new_v4(), dec!(-5), 13, 2026, now, None, now);
        assert!(snapshot_from_row(row).is_err());

        let row: SnapshotRow = (Uuid::new_v4(), Uuid::new_v4(), dec!(-5), 12, 2026, now, None, now);
        let snapshot = snapshot_from_row(row).unwrap();
        assert_eq!(snapshot.balance.value(), dec!(-5));
    }
}
