//! Withdrawal policy module
//!
//! Time-dependent withdrawal rules: the hard blackout window and the
//! weekend / business-hours / after-hours limit tiers.

mod engine;
mod limits;

pub use engine::{PolicyTier, WindowStatus, WithdrawalPolicy};
pub use limits::{WithdrawalLimits, WithdrawalPolicyConfig};
