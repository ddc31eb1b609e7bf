//! Domain module
//!
//! Core ledger types: amounts, movements, snapshots and the account reference.

pub mod account;
pub mod amount;
pub mod clock;
pub mod context;
pub mod movement;
pub mod snapshot;

pub use account::Account;
pub use amount::{Amount, AmountError, Balance};
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::OperationContext;
pub use movement::{AccountMovement, MovementType};
pub use snapshot::AccountBalanceSnapshot;
