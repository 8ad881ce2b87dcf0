//! Narrow contracts with the systems around the lifecycle engine.
//!
//! - `identity` - employee directory and roles
//! - `config_store` - entitlement policy persistence
//! - `sinks` - notifications, audit trail, archival

pub mod config_store;
pub mod identity;
pub mod sinks;

pub use config_store::EntitlementConfigStore;
pub use identity::{ActorContext, EmployeeProfile, EmployeeRole, IdentityProvider};
pub use sinks::{
    AuditRecord, AuditSink, NotificationKind, NotificationSink, Recipient, RecordArchiver,
    SinkError,
};
