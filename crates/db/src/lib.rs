//! Storage layer for Leavewise.
//!
//! This crate provides:
//! - `LeaveStore`, the concurrent in-process store of requests, chronology
//!   and ledger rows
//! - Repositories that run each lifecycle operation as one unit of work
//! - The outbound event dispatcher and reference sinks
//! - Seed files and store snapshots for the worker

pub mod dispatch;
pub mod persistence;
pub mod repositories;
pub mod sinks;
pub mod store;

pub use dispatch::EventDispatcher;
pub use persistence::{SeedData, SeedSummary, StorageError, StoreSnapshot};
pub use repositories::{
    BalanceRepository, CachedEntitlementConfigStore, InMemoryEmployeeDirectory,
    InMemoryEntitlementConfigStore, LeaveRepository, RequestFilter,
};
pub use sinks::{InMemoryAuditLog, StoreArchiver, TracingNotificationSink};
pub use store::LeaveStore;
