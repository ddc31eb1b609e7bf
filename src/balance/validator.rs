//! Balance Validator
//!
//! Decides whether a prospective debit is allowed. Checks run in a fixed
//! order and stop at the first failure:
//! window → minimum → single cap → daily cap → sufficient funds.
//!
//! The result is advisory. The authoritative decision is made by the movement
//! handler, which runs this validation under the account lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::Amount;
use crate::policy::WithdrawalPolicy;
use crate::store::{MovementStore, SnapshotStore, StoreResult};

use super::LedgerView;

pub const INSUFFICIENT_BALANCE: &str = "insufficient balance";

/// Outcome of a withdrawal validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceValidation {
    pub is_valid: bool,
    pub current_balance: Decimal,
    pub available_balance: Decimal,
    pub daily_withdrawal_remaining: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BalanceValidation {
    /// Policy rejection: balances are not computed
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            current_balance: Decimal::ZERO,
            available_balance: Decimal::ZERO,
            daily_withdrawal_remaining: Decimal::ZERO,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BalanceValidator {
    policy: WithdrawalPolicy,
}

impl BalanceValidator {
    pub fn new(policy: WithdrawalPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &WithdrawalPolicy {
        &self.policy
    }

    /// Validate a debit of `amount` from `account_id` at `now`
    pub async fn validate<S>(
        &self,
        store: &mut S,
        account_id: Uuid,
        amount: &Amount,
        now: DateTime<Utc>,
    ) -> StoreResult<BalanceValidation>
    where
        S: MovementStore + SnapshotStore + ?Sized,
    {
        let requested = amount;
        let amount = amount.value();

        let window = self.policy.withdrawal_window(now);
        if !window.open {
            let reason = window
                .reason
                .unwrap_or_else(|| "withdrawal window is closed".to_string());
            return Ok(BalanceValidation::rejected(reason));
        }

        let limits = self.policy.limits_for(now);

        if amount < limits.minimum {
            return Ok(BalanceValidation::rejected(format!(
                "amount {} is below the minimum withdrawal of {}",
                amount, limits.minimum
            )));
        }

        if amount > limits.single {
            return Ok(BalanceValidation::rejected(format!(
                "amount {} exceeds the single withdrawal limit of {}",
                amount, limits.single
            )));
        }

        let view = LedgerView::load(store, account_id).await?;

        let (day_start, day_end) = self.policy.day_bounds(now);
        let withdrawn_today = view.debit_total_between(day_start, day_end);
        if withdrawn_today + amount > limits.daily {
            return Ok(BalanceValidation::rejected(format!(
                "daily withdrawal limit of {} exceeded ({} already withdrawn today)",
                limits.daily, withdrawn_today
            )));
        }
        let daily_withdrawal_remaining = limits.daily - withdrawn_today;

        let balance = view.balance_at(now);
        let is_valid = balance.is_sufficient_for(requested);

        Ok(BalanceValidation {
            is_valid,
            current_balance: balance.value(),
            available_balance: balance.value(),
            daily_withdrawal_remaining,
            reason: (!is_valid).then(|| INSUFFICIENT_BALANCE.to_string()),
        })
    }
}
