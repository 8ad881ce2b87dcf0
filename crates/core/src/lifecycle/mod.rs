//! Leave request lifecycle.
//!
//! - `types` - requests, statuses, chronology and transition actions
//! - `service` - the state machine

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::LifecycleService;
pub use types::{
    Actor, AttachmentRef, ChronologyAction, ChronologyEntry, DayPortion, LeaveRequest,
    LeaveStatus, LeaveSubmission, LifecycleAction,
};
