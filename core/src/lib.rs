//! Esusu/Ajo rotating savings ledger.
//!
//! Component layout (leaves first):
//!   - `account`          balances with the non-negative invariant
//!   - `transaction_log`  append-only record of money movements
//!   - `group_registry`   groups, memberships, capacity
//!   - `contribution`     per-cycle contributions and collection turns
//!   - `ledger`           the orchestrator: one storage transaction per operation
//!
//! `store` is the only module that executes SQL.

pub mod account;
pub mod config;
pub mod contribution;
pub mod error;
pub mod event;
pub mod group_registry;
pub mod intent;
pub mod ledger;
pub mod reconciliation;
pub mod rng;
pub mod simulation;
pub mod store;
pub mod transaction_log;
pub mod types;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{FailurePoint, Ledger};
