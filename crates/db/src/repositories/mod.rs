//! Repositories over the in-process store.
//!
//! Repositories own the units of work: they take the locks, call the pure
//! services in `leavewise-core`, commit, and queue outbound events.

pub mod balance;
pub mod config;
pub mod employee;
pub mod leave;

pub use balance::BalanceRepository;
pub use config::{CachedEntitlementConfigStore, InMemoryEntitlementConfigStore};
pub use employee::InMemoryEmployeeDirectory;
pub use leave::{LeaveRepository, RequestFilter};
