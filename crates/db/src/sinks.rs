//! Reference implementations of the outbound collaborator contracts.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use leavewise_core::collaborators::{
    AuditRecord, AuditSink, NotificationKind, NotificationSink, Recipient, RecordArchiver,
    SinkError,
};
use leavewise_core::lifecycle::LeaveRequest;

use crate::store::LeaveStore;

/// Notification sink that writes each notification to the log.
#[derive(Debug, Clone)]
pub struct TracingNotificationSink {
    hr_recipient: String,
}

impl TracingNotificationSink {
    /// Creates a sink that labels HR notifications with `hr_recipient`.
    #[must_use]
    pub fn new(hr_recipient: impl Into<String>) -> Self {
        Self {
            hr_recipient: hr_recipient.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: Recipient,
        request: &LeaveRequest,
    ) -> Result<(), SinkError> {
        let to = match recipient {
            Recipient::Employee(id) => id.to_string(),
            Recipient::HrTeam => self.hr_recipient.clone(),
        };
        tracing::info!(
            kind = kind.as_str(),
            to = %to,
            request_id = %request.id,
            employee_id = %request.employee_id,
            status = %request.status,
            "Notification sent"
        );
        Ok(())
    }
}

/// Append-only audit log held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn record(&self, record: &AuditRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

/// Archiver that moves closed requests out of the live store.
#[derive(Debug, Clone)]
pub struct StoreArchiver {
    store: Arc<LeaveStore>,
}

impl StoreArchiver {
    /// Creates an archiver over `store`.
    #[must_use]
    pub fn new(store: Arc<LeaveStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RecordArchiver for StoreArchiver {
    async fn archive_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SinkError> {
        let moved = self.store.archive_closed_before(cutoff);
        tracing::info!(moved, %cutoff, "Archived closed leave requests");
        Ok(moved)
    }
}
