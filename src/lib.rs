//! Account Ledger Library
//!
//! Per-account movement ledger with snapshot-based balance reconstruction,
//! time-dependent withdrawal limits and per-account locking.

pub mod api;
pub mod balance;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod jobs;
pub mod lock;
pub mod policy;
pub mod store;

mod error;

pub use config::Config;
pub use domain::{Amount, AmountError, Balance, OperationContext};
pub use error::{ErrorResponse, LedgerError, LedgerResult};
