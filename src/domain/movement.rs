//! Account Movement
//!
//! A single CREDIT or DEBIT entry in an account's ledger.
//! Movements are immutable once constructed: a correction is a new,
//! compensating movement, never an in-place edit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{Amount, Balance};

/// Direction of a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Credit,
    Debit,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Credit => "CREDIT",
            MovementType::Debit => "DEBIT",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(MovementType::Credit),
            "DEBIT" => Ok(MovementType::Debit),
            other => Err(format!("unknown movement type: {}", other)),
        }
    }
}

/// An entry in the per-account ledger.
///
/// The sign of the movement is carried by `movement_type`; `amount` is always
/// strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountMovement {
    id: Uuid,
    account_id: Uuid,
    movement_type: MovementType,
    amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl AccountMovement {
    /// Create a new movement with a fresh identity
    pub fn new(
        account_id: Uuid,
        movement_type: MovementType,
        amount: Amount,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            movement_type,
            amount,
            description,
            created_at,
            updated_at: None,
        }
    }

    /// Rebuild a movement from persisted state
    pub fn from_stored(
        id: Uuid,
        account_id: Uuid,
        movement_type: MovementType,
        amount: Amount,
        description: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            account_id,
            movement_type,
            amount,
            description,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn account_id(&self) -> Uuid {
        self.account_id
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_debit(&self) -> bool {
        self.movement_type == MovementType::Debit
    }

    /// Apply this movement to a running balance
    pub fn apply_to(&self, balance: Balance) -> Balance {
        match self.movement_type {
            MovementType::Credit => balance.credit(&self.amount),
            MovementType::Debit => balance.debit(&self.amount),
        }
    }
}
