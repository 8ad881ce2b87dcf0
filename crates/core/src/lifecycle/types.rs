//! Leave request domain types.
//!
//! A request moves through the following states:
//! - Pending → Approved | Rejected | Cancelled | Escalated
//! - Escalated → Approved | Rejected
//!
//! Approved, Rejected and Cancelled are terminal.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use leavewise_shared::{ChronologyEntryId, EmployeeId, LeaveRequestId};

use crate::entitlement::LeaveType;

/// Leave request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    /// Awaiting the direct manager.
    Pending,
    /// Handed off to HR, either by timeout or because there is no manager.
    Escalated,
    /// Approved; balance-bearing types have been debited.
    Approved,
    /// Rejected by the approver.
    Rejected,
    /// Withdrawn by the requester.
    Cancelled,
}

impl LeaveStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Escalated => "escalated",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Portion of the day taken off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPortion {
    /// Whole day(s).
    #[default]
    Full,
    /// Morning only.
    FirstHalf,
    /// Afternoon only.
    SecondHalf,
}

impl DayPortion {
    /// Returns true for half-day portions.
    #[must_use]
    pub fn is_half(&self) -> bool {
        !matches!(self, Self::Full)
    }

    /// Multiplier applied to the chargeable days of the range.
    #[must_use]
    pub fn factor(&self) -> Decimal {
        if self.is_half() {
            Decimal::new(5, 1)
        } else {
            Decimal::ONE
        }
    }
}

/// Reference to a supporting document held by the file store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Key in the file store.
    pub storage_key: String,
    /// Original file name.
    pub file_name: String,
}

/// What an employee asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveSubmission {
    /// Requesting employee.
    pub employee_id: EmployeeId,
    /// Type of leave.
    pub leave_type: LeaveType,
    /// First day off.
    pub start_date: NaiveDate,
    /// Last day off, inclusive.
    pub end_date: NaiveDate,
    /// Whole or half day.
    #[serde(default)]
    pub day_portion: DayPortion,
    /// Free-text reason.
    pub reason: String,
    /// Supporting document.
    pub attachment: Option<AttachmentRef>,
    /// Sub-type tag for catch-all categories.
    pub sub_type: Option<String>,
}

impl LeaveSubmission {
    /// Creates a full-day submission with no attachment or sub-type.
    #[must_use]
    pub fn new(
        employee_id: EmployeeId,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            employee_id,
            leave_type,
            start_date,
            end_date,
            day_portion: DayPortion::Full,
            reason: String::new(),
            attachment: None,
            sub_type: None,
        }
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Sets the day portion.
    #[must_use]
    pub fn with_portion(mut self, portion: DayPortion) -> Self {
        self.day_portion = portion;
        self
    }

    /// Attaches a supporting document.
    #[must_use]
    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Sets the sub-type tag.
    #[must_use]
    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }
}

/// A leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    /// Unique identifier.
    pub id: LeaveRequestId,
    /// Requesting employee.
    pub employee_id: EmployeeId,
    /// Type of leave.
    pub leave_type: LeaveType,
    /// First day off.
    pub start_date: NaiveDate,
    /// Last day off, inclusive.
    pub end_date: NaiveDate,
    /// Whole or half day.
    pub day_portion: DayPortion,
    /// Days charged against the ledger.
    pub duration: Decimal,
    /// Current status.
    pub status: LeaveStatus,
    /// Designated approver (the direct manager), if any.
    pub approver_id: Option<EmployeeId>,
    /// Free-text reason.
    pub reason: String,
    /// Supporting document.
    pub attachment: Option<AttachmentRef>,
    /// Sub-type tag.
    pub sub_type: Option<String>,
    /// Set once the request has been handed off to HR.
    pub is_escalated: bool,
    /// When the request was escalated.
    pub escalated_at: Option<DateTime<Utc>>,
    /// Who decided the request.
    pub decided_by: Option<EmployeeId>,
    /// When the request was approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// When the request was rejected.
    pub rejected_at: Option<DateTime<Utc>>,
    /// Reason given for the rejection.
    pub rejection_reason: Option<String>,
    /// When the request was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// When the request was submitted.
    pub created_at: DateTime<Utc>,
    /// When the request last changed.
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// Builds a new request from a validated submission.
    #[must_use]
    pub fn from_submission(
        submission: LeaveSubmission,
        duration: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LeaveRequestId::new(),
            employee_id: submission.employee_id,
            leave_type: submission.leave_type,
            start_date: submission.start_date,
            end_date: submission.end_date,
            day_portion: submission.day_portion,
            duration,
            status: LeaveStatus::Pending,
            approver_id: None,
            reason: submission.reason,
            attachment: submission.attachment,
            sub_type: submission.sub_type,
            is_escalated: false,
            escalated_at: None,
            decided_by: None,
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
            cancelled_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Ledger year the request is charged to: the year it starts in.
    #[must_use]
    pub fn balance_year(&self) -> i32 {
        self.start_date.year()
    }

    /// Returns true if the request covers any day of `[from, to]`.
    #[must_use]
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start_date <= to && self.end_date >= from
    }
}

/// Who performed a recorded action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Actor {
    /// An employee.
    Employee(EmployeeId),
    /// A scheduled job.
    System,
}

/// Action tag of a chronology entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChronologyAction {
    /// Request created.
    Submitted,
    /// Request approved.
    Approved,
    /// Request rejected.
    Rejected,
    /// Request cancelled.
    Cancelled,
    /// Request escalated by the sweep.
    Escalated,
    /// Free-text comment.
    Commented,
}

impl ChronologyAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Escalated => "escalated",
            Self::Commented => "commented",
        }
    }
}

impl fmt::Display for ChronologyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Write-once record of an action taken against a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChronologyEntry {
    /// Unique identifier.
    pub id: ChronologyEntryId,
    /// The request acted upon.
    pub request_id: LeaveRequestId,
    /// What happened.
    pub action: ChronologyAction,
    /// Who did it.
    pub actor: Actor,
    /// Optional comment.
    pub comment: Option<String>,
    /// Structured snapshot of the request at that moment.
    pub metadata: serde_json::Value,
    /// When it happened.
    pub recorded_at: DateTime<Utc>,
}

impl ChronologyEntry {
    /// Creates an entry with empty metadata.
    #[must_use]
    pub fn new(
        request_id: LeaveRequestId,
        action: ChronologyAction,
        actor: Actor,
        comment: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ChronologyEntryId::new(),
            request_id,
            action,
            actor,
            comment,
            metadata: serde_json::Value::Null,
            recorded_at,
        }
    }

    /// Attaches structured metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A validated state transition with its audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Create a request, routed to the manager or straight to HR.
    Submit {
        /// Pending, or Escalated when there is no manager.
        new_status: LeaveStatus,
        /// The requester.
        submitted_by: EmployeeId,
        /// The requester's direct manager.
        approver_id: Option<EmployeeId>,
        /// When the request was created.
        submitted_at: DateTime<Utc>,
    },
    /// Approve an open request.
    Approve {
        /// The new status (Approved).
        new_status: LeaveStatus,
        /// The approving employee.
        approved_by: EmployeeId,
        /// When the request was approved.
        approved_at: DateTime<Utc>,
        /// Optional approver comment.
        comment: Option<String>,
    },
    /// Reject an open request.
    Reject {
        /// The new status (Rejected).
        new_status: LeaveStatus,
        /// The rejecting employee.
        rejected_by: EmployeeId,
        /// When the request was rejected.
        rejected_at: DateTime<Utc>,
        /// Mandatory reason.
        reason: String,
    },
    /// Withdraw a pending request.
    Cancel {
        /// The new status (Cancelled).
        new_status: LeaveStatus,
        /// The requester.
        cancelled_by: EmployeeId,
        /// When the request was cancelled.
        cancelled_at: DateTime<Utc>,
        /// Optional comment.
        comment: Option<String>,
    },
    /// Hand a pending request off to HR.
    Escalate {
        /// The new status (Escalated).
        new_status: LeaveStatus,
        /// When the request was escalated.
        escalated_at: DateTime<Utc>,
        /// Threshold that triggered the escalation.
        after_days: u32,
    },
}

impl LifecycleAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub fn new_status(&self) -> LeaveStatus {
        match self {
            Self::Submit { new_status, .. }
            | Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. }
            | Self::Cancel { new_status, .. }
            | Self::Escalate { new_status, .. } => *new_status,
        }
    }

    /// Chronology tag recorded for this action.
    ///
    /// Auto-escalated submissions are still recorded as `submitted`.
    #[must_use]
    pub fn chronology_action(&self) -> ChronologyAction {
        match self {
            Self::Submit { .. } => ChronologyAction::Submitted,
            Self::Approve { .. } => ChronologyAction::Approved,
            Self::Reject { .. } => ChronologyAction::Rejected,
            Self::Cancel { .. } => ChronologyAction::Cancelled,
            Self::Escalate { .. } => ChronologyAction::Escalated,
        }
    }

    /// Writes the transition onto `request`.
    pub fn apply(&self, request: &mut LeaveRequest) {
        request.status = self.new_status();
        match self {
            Self::Submit {
                approver_id,
                submitted_at,
                new_status,
                ..
            } => {
                request.approver_id = *approver_id;
                request.created_at = *submitted_at;
                request.updated_at = *submitted_at;
                if *new_status == LeaveStatus::Escalated {
                    request.is_escalated = true;
                    request.escalated_at = Some(*submitted_at);
                }
            }
            Self::Approve {
                approved_by,
                approved_at,
                ..
            } => {
                request.decided_by = Some(*approved_by);
                request.approved_at = Some(*approved_at);
                request.updated_at = *approved_at;
            }
            Self::Reject {
                rejected_by,
                rejected_at,
                reason,
                ..
            } => {
                request.decided_by = Some(*rejected_by);
                request.rejected_at = Some(*rejected_at);
                request.rejection_reason = Some(reason.clone());
                request.updated_at = *rejected_at;
            }
            Self::Cancel { cancelled_at, .. } => {
                request.cancelled_at = Some(*cancelled_at);
                request.updated_at = *cancelled_at;
            }
            Self::Escalate { escalated_at, .. } => {
                request.is_escalated = true;
                request.escalated_at = Some(*escalated_at);
                request.updated_at = *escalated_at;
            }
        }
    }

    /// Chronology entry describing this action on `request` after `apply`.
    #[must_use]
    pub fn chronology_entry(&self, request: &LeaveRequest) -> ChronologyEntry {
        let (actor, comment, at) = match self {
            Self::Submit {
                submitted_by,
                submitted_at,
                ..
            } => (
                Actor::Employee(*submitted_by),
                (!request.reason.is_empty()).then(|| request.reason.clone()),
                *submitted_at,
            ),
            Self::Approve {
                approved_by,
                approved_at,
                comment,
                ..
            } => (Actor::Employee(*approved_by), comment.clone(), *approved_at),
            Self::Reject {
                rejected_by,
                rejected_at,
                reason,
                ..
            } => (Actor::Employee(*rejected_by), Some(reason.clone()), *rejected_at),
            Self::Cancel {
                cancelled_by,
                cancelled_at,
                comment,
                ..
            } => (Actor::Employee(*cancelled_by), comment.clone(), *cancelled_at),
            Self::Escalate {
                escalated_at,
                after_days,
                ..
            } => (
                Actor::System,
                Some(format!("{after_days}-day escalation rule")),
                *escalated_at,
            ),
        };

        let mut metadata = serde_json::json!({
            "status": request.status,
            "leave_type": request.leave_type,
            "start_date": request.start_date,
            "end_date": request.end_date,
            "duration": request.duration,
            "is_escalated": request.is_escalated,
        });
        if let Self::Escalate { after_days, .. } = self {
            metadata["escalation_days"] = serde_json::json!(after_days);
        }

        ChronologyEntry::new(request.id, self.chronology_action(), actor, comment, at)
            .with_metadata(metadata)
    }
}
