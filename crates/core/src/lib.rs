//! Core leave lifecycle logic for Leavewise.
//!
//! This crate contains pure business logic with no storage or transport
//! dependencies. Domain types, validation rules and calculations live here;
//! persistence and delivery sit behind the traits in `collaborators`.
//!
//! # Modules
//!
//! - `calendar` - Public holidays by region
//! - `entitlement` - Leave policy, quotas and chargeable duration
//! - `ledger` - Per-employee, per-type, per-year balance rows
//! - `lifecycle` - Leave request state machine and chronology
//! - `collaborators` - Identity, policy store and side-effect sinks
//! - `events` - Outbound notification and audit queue
//! - `payroll` - Approved-leave projection for payroll

pub mod calendar;
pub mod collaborators;
pub mod entitlement;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod payroll;

pub use error::LeaveError;
