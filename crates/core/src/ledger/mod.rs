//! Leave balance ledger.
//!
//! - `balance` - ledger rows keyed by (employee, leave type, year)
//! - `service` - debit, override and carry-forward arithmetic

pub mod balance;
pub mod service;

#[cfg(test)]
mod service_props;

pub use balance::{BalanceKey, LeaveBalance};
pub use service::{BalanceOverride, CarryForwardOutcome, LedgerService};
