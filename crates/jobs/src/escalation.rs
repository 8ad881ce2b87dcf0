//! Daily sweeps over pending requests.
//!
//! Both sweeps read a snapshot of the pending requests and handle each one
//! independently: a failure on one request is logged and the sweep moves on.

use std::sync::Arc;

use chrono::Duration;

use leavewise_core::collaborators::{NotificationKind, Recipient};
use leavewise_core::events::EventOutbox;
use leavewise_db::LeaveRepository;
use leavewise_shared::{Clock, PolicyConfig};

/// Outcome of one escalation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscalationReport {
    /// Requests old enough to escalate.
    pub examined: usize,
    /// Requests moved to Escalated.
    pub escalated: usize,
    /// Requests that changed state before they could be escalated.
    pub skipped: usize,
    /// Requests that could not be escalated.
    pub failed: usize,
}

/// Outcome of one reminder sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderReport {
    /// Reminders queued.
    pub sent: usize,
}

/// Escalates stale requests and reminds approvers.
#[derive(Clone)]
pub struct EscalationScheduler {
    leave: LeaveRepository,
    outbox: EventOutbox,
    clock: Arc<dyn Clock>,
    escalation_days: u32,
    reminder_days: u32,
}

impl EscalationScheduler {
    /// Creates a scheduler using the thresholds in `policy`.
    #[must_use]
    pub fn new(
        leave: LeaveRepository,
        outbox: EventOutbox,
        clock: Arc<dyn Clock>,
        policy: &PolicyConfig,
    ) -> Self {
        Self {
            leave,
            outbox,
            clock,
            escalation_days: policy.escalation_days,
            reminder_days: policy.reminder_days,
        }
    }

    /// Escalates every Pending request filed more than `escalation_days` ago.
    ///
    /// HR is notified for each request actually escalated.
    pub fn check_escalated_requests(&self) -> EscalationReport {
        let cutoff = self.clock.now() - Duration::days(i64::from(self.escalation_days));
        let stale = self.leave.pending_created_before(cutoff);
        let mut report = EscalationReport {
            examined: stale.len(),
            ..EscalationReport::default()
        };

        for request in stale {
            match self.leave.escalate(request.id, self.escalation_days) {
                Ok(Some(_)) => report.escalated += 1,
                Ok(None) => report.skipped += 1,
                Err(err) if err.is_conflict() => {
                    tracing::debug!(request_id = %request.id, error = %err, "Request no longer pending");
                    report.skipped += 1;
                }
                Err(err) => {
                    tracing::error!(
                        request_id = %request.id,
                        error = %err,
                        error_code = err.error_code(),
                        "Escalation failed"
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            examined = report.examined,
            escalated = report.escalated,
            failed = report.failed,
            "Escalation sweep finished"
        );
        report
    }

    /// Reminds the approver of every Pending request filed more than
    /// `reminder_days` ago. Request state is not touched.
    pub fn send_reminder_emails(&self) -> ReminderReport {
        let cutoff = self.clock.now() - Duration::days(i64::from(self.reminder_days));
        let mut report = ReminderReport::default();

        for request in self.leave.pending_created_before(cutoff) {
            let recipient = request
                .approver_id
                .map_or(Recipient::HrTeam, Recipient::Employee);
            self.outbox
                .notify(NotificationKind::Reminder, recipient, &request);
            report.sent += 1;
        }

        tracing::info!(sent = report.sent, "Reminder sweep finished");
        report
    }
}
