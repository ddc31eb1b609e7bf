//! Query Handler
//!
//! Tenant-checked reads. Every query runs in its own unit-of-work, which is
//! rolled back once the data is loaded.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::balance::{BalanceValidation, BalanceValidator, LedgerView};
use crate::domain::{Account, AccountMovement, Amount, Balance, Clock};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{
    AccountStore, MovementStore, Page, PageRequest, TransactionManager, UnitOfWork,
};

/// Reconstructed balance of an account
#[derive(Debug, Clone, Serialize)]
pub struct AccountBalance {
    pub account_id: Uuid,
    pub balance: Balance,
    pub as_of: DateTime<Utc>,
    /// Period of the snapshot the balance was rebuilt from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_period: Option<(i32, u32)>,
}

/// Load `account_id` and check that it belongs to `business_id`
pub(crate) async fn load_owned_account<S>(
    store: &mut S,
    account_id: Uuid,
    business_id: Uuid,
) -> LedgerResult<Account>
where
    S: AccountStore + ?Sized,
{
    let account = store
        .find_account(account_id)
        .await?
        .ok_or_else(|| LedgerError::account_not_found(account_id))?;

    if !account.belongs_to(business_id) {
        return Err(LedgerError::NotAllowed(format!(
            "account {} does not belong to business {}",
            account_id, business_id
        )));
    }

    Ok(account)
}

/// Discard a read-only unit-of-work and hand back its result
async fn finish<W: UnitOfWork, R>(work: W, result: LedgerResult<R>) -> LedgerResult<R> {
    if let Err(e) = work.rollback().await {
        tracing::warn!(error = %e, "Rollback of read-only unit-of-work failed");
    }
    result
}

pub struct LedgerQueries<T: TransactionManager> {
    transactions: Arc<T>,
    validator: BalanceValidator,
    clock: Arc<dyn Clock>,
}

impl<T: TransactionManager> Clone for LedgerQueries<T> {
    fn clone(&self) -> Self {
        Self {
            transactions: Arc::clone(&self.transactions),
            validator: self.validator.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T: TransactionManager> LedgerQueries<T> {
    pub fn new(transactions: Arc<T>, validator: BalanceValidator, clock: Arc<dyn Clock>) -> Self {
        Self {
            transactions,
            validator,
            clock,
        }
    }

    /// Single movement, visible only to the business owning its account
    pub async fn get_movement(
        &self,
        movement_id: Uuid,
        business_id: Uuid,
    ) -> LedgerResult<AccountMovement> {
        let mut work = self.transactions.begin().await?;
        let result = Self::owned_movement(&mut work, movement_id, business_id).await;
        finish(work, result).await
    }

    async fn owned_movement(
        work: &mut T::Work,
        movement_id: Uuid,
        business_id: Uuid,
    ) -> LedgerResult<AccountMovement> {
        let movement = work
            .find_movement_by_id(movement_id)
            .await?
            .ok_or_else(|| {
                LedgerError::ResourceNotFound(format!("movement {} not found", movement_id))
            })?;

        load_owned_account(work, movement.account_id(), business_id).await?;
        Ok(movement)
    }

    /// Newest-first page of an account's movements
    pub async fn list_movements(
        &self,
        account_id: Uuid,
        business_id: Uuid,
        page: &PageRequest,
    ) -> LedgerResult<Page<AccountMovement>> {
        let mut work = self.transactions.begin().await?;
        let result = async {
            load_owned_account(&mut work, account_id, business_id).await?;
            Ok::<_, LedgerError>(work.find_movements(account_id, page).await?)
        }
        .await;
        finish(work, result).await
    }

    /// Balance reconstructed from the latest snapshot and later movements
    pub async fn current_balance(
        &self,
        account_id: Uuid,
        business_id: Uuid,
    ) -> LedgerResult<AccountBalance> {
        let now = self.clock.now();
        let mut work = self.transactions.begin().await?;
        let result = async {
            load_owned_account(&mut work, account_id, business_id).await?;
            let view = LedgerView::load(&mut work, account_id).await?;
            Ok::<_, LedgerError>(AccountBalance {
                account_id,
                balance: view.balance_at(now),
                as_of: now,
                snapshot_period: view.snapshot.as_ref().map(|s| s.period_key()),
            })
        }
        .await;
        finish(work, result).await
    }

    /// Advisory check of a prospective debit. Nothing is written.
    pub async fn validate_balance(
        &self,
        account_id: Uuid,
        business_id: Uuid,
        amount: Decimal,
    ) -> LedgerResult<BalanceValidation> {
        let amount = Amount::new(amount)
            .map_err(|e| LedgerError::InvalidOperation(format!("Invalid amount: {}", e)))?;
        let now = self.clock.now();

        let mut work = self.transactions.begin().await?;
        let result = async {
            load_owned_account(&mut work, account_id, business_id).await?;
            let validation = self
                .validator
                .validate(&mut work, account_id, &amount, now)
                .await?;
            if !validation.is_valid {
                tracing::debug!(
                    account_id = %account_id,
                    reason = ?validation.reason,
                    "Withdrawal would be rejected"
                );
            }
            Ok::<_, LedgerError>(validation)
        }
        .await;
        finish(work, result).await
    }
}
