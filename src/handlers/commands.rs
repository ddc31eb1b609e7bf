//! Command definitions
//!
//! Commands represent intentions to change the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::MovementType;

/// Command to append a movement to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMovementCommand {
    pub account_id: Uuid,
    /// Tenant the caller acts for; must own the account
    pub business_id: Uuid,
    pub movement_type: MovementType,
    /// Raw amount, validated into an `Amount` by the handler
    pub amount: Decimal,
    pub description: Option<String>,
}

impl CreateMovementCommand {
    pub fn new(
        account_id: Uuid,
        business_id: Uuid,
        movement_type: MovementType,
        amount: Decimal,
    ) -> Self {
        Self {
            account_id,
            business_id,
            movement_type,
            amount,
            description: None,
        }
    }

    pub fn credit(account_id: Uuid, business_id: Uuid, amount: Decimal) -> Self {
        Self::new(account_id, business_id, MovementType::Credit, amount)
    }

    pub fn debit(account_id: Uuid, business_id: Uuid, amount: Decimal) -> Self {
        Self::new(account_id, business_id, MovementType::Debit, amount)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
