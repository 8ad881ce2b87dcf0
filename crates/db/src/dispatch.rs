//! Delivery of queued outbound events.
//!
//! Events are delivered one at a time in queue order. A failed delivery is
//! logged and dropped; nothing is retried and nothing is reported back to
//! the operation that queued it.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use leavewise_core::collaborators::{AuditSink, NotificationSink};
use leavewise_core::events::OutboundEvent;

/// Counters for one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events the sinks accepted.
    pub delivered: u64,
    /// Events the sinks refused.
    pub failed: u64,
}

/// Drains the outbox into the notification and audit sinks.
#[derive(Clone)]
pub struct EventDispatcher {
    notifications: Arc<dyn NotificationSink>,
    audit: Arc<dyn AuditSink>,
}

impl EventDispatcher {
    /// Creates a dispatcher over the given sinks.
    #[must_use]
    pub fn new(notifications: Arc<dyn NotificationSink>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            notifications,
            audit,
        }
    }

    /// Delivers events until every sender is dropped.
    pub async fn run(self, mut events: UnboundedReceiver<OutboundEvent>) -> DispatchStats {
        let mut stats = DispatchStats::default();
        while let Some(event) = events.recv().await {
            if self.deliver(event).await {
                stats.delivered += 1;
            } else {
                stats.failed += 1;
            }
        }
        tracing::info!(
            delivered = stats.delivered,
            failed = stats.failed,
            "Event dispatcher stopped"
        );
        stats
    }

    /// Delivers one event. Returns false if the sink refused it.
    pub async fn deliver(&self, event: OutboundEvent) -> bool {
        match event {
            OutboundEvent::Notification {
                kind,
                recipient,
                request,
            } => match self.notifications.notify(kind, recipient, &request).await {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(
                        request_id = %request.id,
                        kind = kind.as_str(),
                        error = %err,
                        "Notification delivery failed"
                    );
                    false
                }
            },
            OutboundEvent::Audit(record) => match self.audit.record(&record).await {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(
                        audit_id = %record.id,
                        action = %record.action,
                        error = %err,
                        "Audit delivery failed"
                    );
                    false
                }
            },
        }
    }
}
