//! Leave request state machine.
//!
//! Every function here is pure: it inspects the current request and the
//! acting principal, and either returns the `LifecycleAction` to commit or the
//! error explaining why nothing may change. The transition is checked before
//! the actor, so a request in the wrong state always reports
//! `InvalidTransition` regardless of who asked.

use chrono::{DateTime, Utc};

use crate::collaborators::{ActorContext, EmployeeProfile};
use crate::error::LeaveError;
use crate::lifecycle::types::{LeaveRequest, LeaveStatus, LifecycleAction};

/// Stateless service for leave request transitions.
pub struct LifecycleService;

impl LifecycleService {
    /// Route a new request.
    ///
    /// The approver is the requester's direct manager. Without a manager the
    /// request starts out `Escalated`.
    #[must_use]
    pub fn submit(requester: &EmployeeProfile, submitted_at: DateTime<Utc>) -> LifecycleAction {
        let new_status = if requester.manager_id.is_some() {
            LeaveStatus::Pending
        } else {
            LeaveStatus::Escalated
        };

        LifecycleAction::Submit {
            new_status,
            submitted_by: requester.id,
            approver_id: requester.manager_id,
            submitted_at,
        }
    }

    /// Approve an open request.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` unless the request is Pending or Escalated
    /// * `NotAuthorized` unless the actor may decide the request
    pub fn approve(
        request: &LeaveRequest,
        actor: &ActorContext,
        comment: Option<String>,
        approved_at: DateTime<Utc>,
    ) -> Result<LifecycleAction, LeaveError> {
        Self::ensure_transition(request, LeaveStatus::Approved, "approve")?;
        Self::ensure_decider(request, actor, "approve")?;

        Ok(LifecycleAction::Approve {
            new_status: LeaveStatus::Approved,
            approved_by: actor.employee_id,
            approved_at,
            comment: comment.filter(|c| !c.trim().is_empty()),
        })
    }

    /// Reject an open request.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` unless the request is Pending or Escalated
    /// * `NotAuthorized` unless the actor may decide the request
    /// * `ReasonRequired` if the reason is blank
    pub fn reject(
        request: &LeaveRequest,
        actor: &ActorContext,
        reason: String,
        rejected_at: DateTime<Utc>,
    ) -> Result<LifecycleAction, LeaveError> {
        Self::ensure_transition(request, LeaveStatus::Rejected, "reject")?;
        Self::ensure_decider(request, actor, "reject")?;
        if reason.trim().is_empty() {
            return Err(LeaveError::ReasonRequired);
        }

        Ok(LifecycleAction::Reject {
            new_status: LeaveStatus::Rejected,
            rejected_by: actor.employee_id,
            rejected_at,
            reason,
        })
    }

    /// Withdraw a request that is still Pending.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` unless the request is Pending
    /// * `NotAuthorized` unless the actor is the requester
    pub fn cancel(
        request: &LeaveRequest,
        actor: &ActorContext,
        comment: Option<String>,
        cancelled_at: DateTime<Utc>,
    ) -> Result<LifecycleAction, LeaveError> {
        Self::ensure_transition(request, LeaveStatus::Cancelled, "cancel")?;
        if actor.employee_id != request.employee_id {
            return Err(LeaveError::NotAuthorized {
                actor: actor.employee_id,
                action: "cancel",
            });
        }

        Ok(LifecycleAction::Cancel {
            new_status: LeaveStatus::Cancelled,
            cancelled_by: actor.employee_id,
            cancelled_at,
            comment: comment.filter(|c| !c.trim().is_empty()),
        })
    }

    /// Hand a Pending request off to HR.
    ///
    /// Returns `Ok(None)` when the request is already Escalated.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` if the request is terminal
    pub fn escalate(
        request: &LeaveRequest,
        after_days: u32,
        escalated_at: DateTime<Utc>,
    ) -> Result<Option<LifecycleAction>, LeaveError> {
        if request.status == LeaveStatus::Escalated {
            return Ok(None);
        }
        Self::ensure_transition(request, LeaveStatus::Escalated, "escalate")?;
        Ok(Some(LifecycleAction::Escalate {
            new_status: LeaveStatus::Escalated,
            escalated_at,
            after_days,
        }))
    }

    /// Check that `actor` may comment on `request`.
    ///
    /// The requester, the designated approver and HR-and-above may comment
    /// at any time.
    ///
    /// # Errors
    ///
    /// * `NotAuthorized` for anyone else
    pub fn authorize_comment(request: &LeaveRequest, actor: &ActorContext) -> Result<(), LeaveError> {
        let allowed = actor.employee_id == request.employee_id
            || request.approver_id == Some(actor.employee_id)
            || actor.role.is_hr_or_above();
        if allowed {
            Ok(())
        } else {
            Err(LeaveError::NotAuthorized {
                actor: actor.employee_id,
                action: "comment on",
            })
        }
    }

    /// Returns true if `actor` may approve or reject `request` in its current state.
    ///
    /// Nobody decides their own request. The designated approver decides a
    /// Pending request; once Escalated, HR and above may decide it as well.
    #[must_use]
    pub fn can_decide(request: &LeaveRequest, actor: &ActorContext) -> bool {
        if actor.employee_id == request.employee_id {
            return false;
        }
        let is_approver = request.approver_id == Some(actor.employee_id);
        match request.status {
            LeaveStatus::Pending => is_approver,
            LeaveStatus::Escalated => is_approver || actor.role.is_hr_or_above(),
            _ => false,
        }
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Pending → Escalated (escalate)
    /// - Pending | Escalated → Approved (approve)
    /// - Pending | Escalated → Rejected (reject)
    /// - Pending → Cancelled (cancel)
    #[must_use]
    pub fn is_valid_transition(from: LeaveStatus, to: LeaveStatus) -> bool {
        matches!(
            (from, to),
            (
                LeaveStatus::Pending,
                LeaveStatus::Escalated | LeaveStatus::Cancelled
            ) | (
                LeaveStatus::Pending | LeaveStatus::Escalated,
                LeaveStatus::Approved | LeaveStatus::Rejected
            )
        )
    }

    fn ensure_transition(
        request: &LeaveRequest,
        to: LeaveStatus,
        action: &'static str,
    ) -> Result<(), LeaveError> {
        if Self::is_valid_transition(request.status, to) {
            Ok(())
        } else {
            Err(LeaveError::InvalidTransition {
                from: request.status,
                action,
            })
        }
    }

    fn ensure_decider(
        request: &LeaveRequest,
        actor: &ActorContext,
        action: &'static str,
    ) -> Result<(), LeaveError> {
        if Self::can_decide(request, actor) {
            Ok(())
        } else {
            Err(LeaveError::NotAuthorized {
                actor: actor.employee_id,
                action,
            })
        }
    }
}
