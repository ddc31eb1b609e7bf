//! Account reference
//!
//! Accounts are owned by the surrounding system; the ledger only reads them
//! to resolve tenancy and to enumerate active accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Owning business (tenant)
    pub business_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: Uuid, business_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            business_id,
            name: name.into(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn belongs_to(&self, business_id: Uuid) -> bool {
        self.business_id == business_id
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}
