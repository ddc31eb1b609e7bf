//! Balance module
//!
//! Snapshot-based balance reconstruction and withdrawal validation.

pub mod reconstructor;
pub mod validator;

pub use reconstructor::{current_balance, replay, LedgerView};
pub use validator::{BalanceValidation, BalanceValidator, INSUFFICIENT_BALANCE};
