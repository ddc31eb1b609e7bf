//! Withdrawal limit tables

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monetary caps in force at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalLimits {
    /// Maximum total of debits per local calendar day
    pub daily: Decimal,
    /// Maximum amount of a single debit
    pub single: Decimal,
    /// Minimum amount of a single debit
    pub minimum: Decimal,
}

impl WithdrawalLimits {
    pub fn new(daily: i64, single: i64, minimum: i64) -> Self {
        Self {
            daily: Decimal::from(daily),
            single: Decimal::from(single),
            minimum: Decimal::from(minimum),
        }
    }
}

/// Policy tables and window hours.
///
/// Hours are local hours in `0..24`. The blackout window may wrap midnight
/// (`blackout_start_hour > blackout_end_hour`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalPolicyConfig {
    pub weekend: WithdrawalLimits,
    pub business_hours: WithdrawalLimits,
    pub after_hours: WithdrawalLimits,
    pub blackout_start_hour: u32,
    pub blackout_end_hour: u32,
    /// First hour of the weekday after-hours tier
    pub business_hours_end_hour: u32,
}

impl Default for WithdrawalPolicyConfig {
    fn default() -> Self {
        Self {
            weekend: WithdrawalLimits::new(2000, 500, 20),
            business_hours: WithdrawalLimits::new(5000, 2000, 20),
            after_hours: WithdrawalLimits::new(3000, 1000, 20),
            blackout_start_hour: 22,
            blackout_end_hour: 6,
            business_hours_end_hour: 20,
        }
    }
}
