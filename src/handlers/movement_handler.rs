//! Movement Handler
//!
//! Appends a movement under the per-account lock. Debits are validated
//! against the withdrawal policy and the reconstructed balance inside the
//! same lock scope and unit-of-work as the append, so concurrent debits
//! cannot overdraw the account.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::balance::BalanceValidator;
use crate::domain::{AccountMovement, Amount, Clock, MovementType};
use crate::error::{LedgerError, LedgerResult};
use crate::lock::{account_lock_key, LockManager};
use crate::store::{MovementStore, TransactionManager, UnitOfWork};

use super::query_handler::load_owned_account;
use super::CreateMovementCommand;

/// Handler for movement creation
pub struct CreateMovementHandler<T: TransactionManager, L: LockManager> {
    transactions: Arc<T>,
    locks: Arc<L>,
    validator: BalanceValidator,
    clock: Arc<dyn Clock>,
}

impl<T: TransactionManager, L: LockManager> Clone for CreateMovementHandler<T, L> {
    fn clone(&self) -> Self {
        Self {
            transactions: Arc::clone(&self.transactions),
            locks: Arc::clone(&self.locks),
            validator: self.validator.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T: TransactionManager, L: LockManager> CreateMovementHandler<T, L> {
    pub fn new(
        transactions: Arc<T>,
        locks: Arc<L>,
        validator: BalanceValidator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transactions,
            locks,
            validator,
            clock,
        }
    }

    /// Execute the command
    pub async fn execute(&self, command: CreateMovementCommand) -> LedgerResult<AccountMovement> {
        let amount = Amount::new(command.amount)
            .map_err(|e| LedgerError::InvalidOperation(format!("Invalid amount: {}", e)))?;

        let lock_key = account_lock_key(command.account_id);
        match self.locks.acquire(&lock_key).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(lock_key = %lock_key, "Account is busy, lock not acquired");
                return Err(LedgerError::LockAcquisitionFailed(format!(
                    "account {} is being modified by another operation",
                    command.account_id
                )));
            }
            Err(e) => {
                return Err(LedgerError::InternalServerError(format!(
                    "lock manager failed: {}",
                    e
                )));
            }
        }

        let outcome = AssertUnwindSafe(self.create_locked(&command, amount))
            .catch_unwind()
            .await;

        if let Err(e) = self.locks.release(&lock_key).await {
            tracing::error!(lock_key = %lock_key, error = %e, "Failed to release account lock");
        }

        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    account_id = %command.account_id,
                    "Movement creation panicked"
                );
                Err(LedgerError::InternalServerError(
                    "unexpected failure while creating movement".to_string(),
                ))
            }
        }
    }

    async fn create_locked(
        &self,
        command: &CreateMovementCommand,
        amount: Amount,
    ) -> LedgerResult<AccountMovement> {
        let mut work = self.transactions.begin().await?;

        match self.append(&mut work, command, amount).await {
            Ok(movement) => {
                work.commit().await?;
                tracing::info!(
                    account_id = %movement.account_id(),
                    movement_id = %movement.id(),
                    movement_type = %movement.movement_type(),
                    amount = %movement.amount(),
                    "Movement created"
                );
                Ok(movement)
            }
            Err(e) => {
                if let Err(rollback_err) = work.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn append(
        &self,
        work: &mut T::Work,
        command: &CreateMovementCommand,
        amount: Amount,
    ) -> LedgerResult<AccountMovement> {
        let account = load_owned_account(work, command.account_id, command.business_id).await?;

        let now = self.clock.now();

        if command.movement_type == MovementType::Debit {
            let validation = self
                .validator
                .validate(work, account.id, &amount, now)
                .await?;

            if !validation.is_valid {
                let reason = validation
                    .reason
                    .unwrap_or_else(|| "withdrawal rejected".to_string());
                tracing::warn!(account_id = %account.id, reason = %reason, "Debit rejected");
                return Err(LedgerError::InvalidOperation(reason));
            }
        }

        let movement = AccountMovement::new(
            account.id,
            command.movement_type,
            amount,
            command.description.clone(),
            now,
        );
        work.create_movement(&movement).await?;

        Ok(movement)
    }
}
