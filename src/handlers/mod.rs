//! Command Handlers module
//!
//! Orchestrates the ledger operations: movement creation under the account
//! lock, and tenant-checked queries.

mod commands;
mod movement_handler;
mod query_handler;

#[cfg(test)]
mod tests;

pub use commands::*;
pub use movement_handler::CreateMovementHandler;
pub use query_handler::{AccountBalance, LedgerQueries};
