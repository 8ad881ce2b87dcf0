//! Outbound side-effect contracts: notifications, audit trail and archival.
//!
//! Every sink is best-effort. Callers never roll back or retry because a sink
//! failed; failures are logged by whoever drives the sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use leavewise_shared::{AuditRecordId, EmployeeId};

use crate::lifecycle::LeaveRequest;

/// Reason a notification is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// A request awaits the recipient's decision.
    Submitted,
    /// The recipient's request was approved.
    Approved,
    /// The recipient's request was rejected.
    Rejected,
    /// A request was handed off to HR.
    Escalated,
    /// A request has been waiting for the recipient for a while.
    Reminder,
}

impl NotificationKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Escalated => "escalated",
            Self::Reminder => "reminder",
        }
    }
}

/// Who receives a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recipient {
    /// A single employee.
    Employee(EmployeeId),
    /// The HR team mailbox.
    HrTeam,
}

/// Before/after snapshot of an administrative change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier.
    pub id: AuditRecordId,
    /// Who made the change.
    pub actor: EmployeeId,
    /// Action tag, e.g. `balance_override` or `config_update`.
    pub action: String,
    /// What was changed, e.g. the ledger key or leave type.
    pub target: String,
    /// State before the change.
    pub before: serde_json::Value,
    /// State after the change.
    pub after: serde_json::Value,
    /// Justification supplied by the actor.
    pub reason: Option<String>,
    /// When the change was committed.
    pub recorded_at: DateTime<Utc>,
}

/// Failure reported by a sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The downstream service rejected or lost the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// The downstream service could not be reached.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Delivers lifecycle notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sends one notification about `request` to `recipient`.
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: Recipient,
        request: &LeaveRequest,
    ) -> Result<(), SinkError>;
}

/// Append-only store of administrative changes.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends one record.
    async fn record(&self, record: &AuditRecord) -> Result<(), SinkError>;
}

/// Moves stale request and chronology records out of the live store.
#[async_trait]
pub trait RecordArchiver: Send + Sync {
    /// Archives closed requests created before `cutoff`. Returns how many moved.
    async fn archive_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SinkError>;
}
