//! Outbound events queued after a unit of work commits.
//!
//! Producers push onto an unbounded channel and never wait for delivery. The
//! consumer side drains the queue into the notification and audit sinks.

use tokio::sync::mpsc;

use crate::collaborators::{AuditRecord, NotificationKind, Recipient};
use crate::lifecycle::LeaveRequest;

/// A side effect to deliver outside the committing operation.
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    /// Notify a recipient about a request.
    Notification {
        /// Why the notification is sent.
        kind: NotificationKind,
        /// Who receives it.
        recipient: Recipient,
        /// Snapshot of the request as committed.
        request: Box<LeaveRequest>,
    },
    /// Append an administrative change to the audit trail.
    Audit(Box<AuditRecord>),
}

/// Sending half of the outbound event queue.
#[derive(Debug, Clone)]
pub struct EventOutbox {
    tx: mpsc::UnboundedSender<OutboundEvent>,
}

impl EventOutbox {
    /// Creates an outbox and the receiver to hand to a dispatcher.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues an event. A closed queue drops the event with a warning.
    pub fn publish(&self, event: OutboundEvent) {
        if let Err(err) = self.tx.send(event) {
            tracing::warn!(event = ?err.0, "Outbox closed, dropping event");
        }
    }

    /// Queues a notification about `request`.
    pub fn notify(&self, kind: NotificationKind, recipient: Recipient, request: &LeaveRequest) {
        self.publish(OutboundEvent::Notification {
            kind,
            recipient,
            request: Box::new(request.clone()),
        });
    }

    /// Queues an audit record.
    pub fn audit(&self, record: AuditRecord) {
        self.publish(OutboundEvent::Audit(Box::new(record)));
    }
}
