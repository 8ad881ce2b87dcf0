//! Shared identifiers, configuration, and clock for Leavewise.
//!
//! This crate provides common pieces used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Application configuration management
//! - A `Clock` abstraction so time-driven policy can be tested

pub mod clock;
pub mod config;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, CacheConfig, PolicyConfig, ScheduleConfig, StorageConfig};
pub use types::{AuditRecordId, ChronologyEntryId, EmployeeId, HolidayId, LeaveRequestId};
