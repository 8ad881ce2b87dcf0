//! Leave request repository: the lifecycle engine.
//!
//! Each operation is one unit of work. The request's entry guard is taken
//! first; an approval then takes the ledger row's guard, debits it and
//! flips the status before either guard is released. Validation and
//! authorization failures return before anything is written. Notifications
//! are queued only after the guards are dropped.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use leavewise_core::LeaveError;
use leavewise_core::collaborators::{ActorContext, IdentityProvider, NotificationKind, Recipient};
use leavewise_core::entitlement::{EntitlementCalculator, LeaveType};
use leavewise_core::events::EventOutbox;
use leavewise_core::ledger::{BalanceKey, LedgerService};
use leavewise_core::lifecycle::{
    Actor, ChronologyAction, ChronologyEntry, LeaveRequest, LeaveStatus, LeaveSubmission,
    LifecycleAction, LifecycleService,
};
use leavewise_shared::{Clock, EmployeeId, LeaveRequestId};

use super::balance::BalanceRepository;
use crate::store::LeaveStore;

/// Filter for request listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFilter {
    /// Only requests in this status.
    pub status: Option<LeaveStatus>,
    /// Only requests starting in this year.
    pub year: Option<i32>,
    /// Only requests of this type.
    pub leave_type: Option<LeaveType>,
}

impl RequestFilter {
    /// Returns true if `request` passes every set criterion.
    #[must_use]
    pub fn matches(&self, request: &LeaveRequest) -> bool {
        self.status.is_none_or(|s| s == request.status)
            && self.year.is_none_or(|y| y == request.start_date.year())
            && self.leave_type.is_none_or(|t| t == request.leave_type)
    }
}

/// Leave request repository.
#[derive(Clone)]
pub struct LeaveRepository {
    store: Arc<LeaveStore>,
    balances: BalanceRepository,
    calculator: Arc<EntitlementCalculator>,
    directory: Arc<dyn IdentityProvider>,
    outbox: EventOutbox,
    clock: Arc<dyn Clock>,
}

impl LeaveRepository {
    /// Creates a new leave repository.
    #[must_use]
    pub fn new(
        store: Arc<LeaveStore>,
        balances: BalanceRepository,
        calculator: Arc<EntitlementCalculator>,
        directory: Arc<dyn IdentityProvider>,
        outbox: EventOutbox,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            balances,
            calculator,
            directory,
            outbox,
            clock,
        }
    }

    /// Validates, prices and files a new request.
    ///
    /// The balance check here is advisory; the approval re-checks under the
    /// row lock. A requester without a manager goes straight to `Escalated`.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the employee is unknown
    /// * any validation error from the calculator
    /// * `InsufficientBalance` for a balance-bearing type that does not fit
    pub fn submit(&self, submission: LeaveSubmission) -> Result<LeaveRequest, LeaveError> {
        let employee_id = submission.employee_id;
        self.try_submit(submission).inspect_err(|err| {
            if err.is_validation() {
                tracing::debug!(%employee_id, error_code = err.error_code(), "Leave request failed validation");
            } else {
                tracing::warn!(
                    %employee_id,
                    status = err.status_code(),
                    error_code = err.error_code(),
                    error = %err,
                    "Leave request refused"
                );
            }
        })
    }

    fn try_submit(&self, submission: LeaveSubmission) -> Result<LeaveRequest, LeaveError> {
        let now = self.clock.now();
        let employee = self.directory.employee(submission.employee_id)?;
        let assessment = self
            .calculator
            .assess(&employee, &submission, self.clock.today())?;

        if assessment.policy.balance_bearing {
            let key = BalanceKey::new(
                employee.id,
                submission.leave_type,
                submission.start_date.year(),
            );
            let row = self.balances.get(key)?;
            LedgerService::ensure_sufficient(&row, assessment.duration)?;
        }

        let mut request = LeaveRequest::from_submission(submission, assessment.duration, now);
        let action = LifecycleService::submit(&employee, now);
        action.apply(&mut request);
        let entry = action.chronology_entry(&request);
        self.store.insert_request(request.clone(), entry);

        tracing::info!(
            request_id = %request.id,
            employee_id = %request.employee_id,
            leave_type = %request.leave_type,
            duration = %request.duration,
            status = %request.status,
            "Leave request submitted"
        );
        let recipient = request
            .approver_id
            .map_or(Recipient::HrTeam, Recipient::Employee);
        self.outbox
            .notify(NotificationKind::Submitted, recipient, &request);
        Ok(request)
    }

    /// Approves a request, debiting the ledger for balance-bearing types.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the request is unknown
    /// * `InvalidTransition` if the request is no longer open
    /// * `NotAuthorized` if the actor may not decide it
    /// * `InsufficientBalance` if the row cannot cover the duration now
    pub fn approve(
        &self,
        id: LeaveRequestId,
        actor: &ActorContext,
        comment: Option<String>,
    ) -> Result<LeaveRequest, LeaveError> {
        let snapshot = self.get(id)?;
        let key = BalanceKey::new(
            snapshot.employee_id,
            snapshot.leave_type,
            snapshot.balance_year(),
        );
        let opening = if self.calculator.policy(snapshot.leave_type).balance_bearing {
            Some(self.balances.opening_row(key)?)
        } else {
            None
        };
        let now = self.clock.now();

        let committed = {
            let mut request = self
                .store
                .requests
                .get_mut(&id)
                .ok_or_else(|| LeaveError::request_not_found(id))?;
            let action = LifecycleService::approve(&request, actor, comment, now)?;
            if let Some(opening) = opening {
                let mut row = self.store.balances.entry(key).or_insert(opening);
                LedgerService::debit(&mut row, request.duration, now)?;
            }
            self.commit(&mut request, &action)
        };

        tracing::info!(
            request_id = %id,
            employee_id = %committed.employee_id,
            approved_by = %actor.employee_id,
            "Leave request approved"
        );
        self.outbox.notify(
            NotificationKind::Approved,
            Recipient::Employee(committed.employee_id),
            &committed,
        );
        Ok(committed)
    }

    /// Rejects a request with a mandatory reason.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the request is unknown
    /// * `InvalidTransition` if the request is no longer open
    /// * `NotAuthorized` if the actor may not decide it
    /// * `ReasonRequired` if the reason is blank
    pub fn reject(
        &self,
        id: LeaveRequestId,
        actor: &ActorContext,
        reason: String,
    ) -> Result<LeaveRequest, LeaveError> {
        let now = self.clock.now();
        let committed = {
            let mut request = self
                .store
                .requests
                .get_mut(&id)
                .ok_or_else(|| LeaveError::request_not_found(id))?;
            let action = LifecycleService::reject(&request, actor, reason, now)?;
            self.commit(&mut request, &action)
        };

        tracing::info!(request_id = %id, rejected_by = %actor.employee_id, "Leave request rejected");
        self.outbox.notify(
            NotificationKind::Rejected,
            Recipient::Employee(committed.employee_id),
            &committed,
        );
        Ok(committed)
    }

    /// Withdraws a pending request.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the request is unknown
    /// * `InvalidTransition` unless the request is Pending
    /// * `NotAuthorized` unless the actor is the requester
    pub fn cancel(
        &self,
        id: LeaveRequestId,
        actor: &ActorContext,
        comment: Option<String>,
    ) -> Result<LeaveRequest, LeaveError> {
        let now = self.clock.now();
        let committed = {
            let mut request = self
                .store
                .requests
                .get_mut(&id)
                .ok_or_else(|| LeaveError::request_not_found(id))?;
            let action = LifecycleService::cancel(&request, actor, comment, now)?;
            self.commit(&mut request, &action)
        };

        tracing::info!(request_id = %id, "Leave request cancelled");
        Ok(committed)
    }

    /// Hands a pending request off to HR.
    ///
    /// Returns `Ok(None)` if it was already escalated.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the request is unknown
    /// * `InvalidTransition` if the request is terminal
    pub fn escalate(
        &self,
        id: LeaveRequestId,
        after_days: u32,
    ) -> Result<Option<LeaveRequest>, LeaveError> {
        let now = self.clock.now();
        let committed = {
            let mut request = self
                .store
                .requests
                .get_mut(&id)
                .ok_or_else(|| LeaveError::request_not_found(id))?;
            let Some(action) = LifecycleService::escalate(&request, after_days, now)? else {
                return Ok(None);
            };
            self.commit(&mut request, &action)
        };

        tracing::info!(request_id = %id, after_days, "Leave request escalated");
        self.outbox
            .notify(NotificationKind::Escalated, Recipient::HrTeam, &committed);
        Ok(Some(committed))
    }

    /// Appends a free-text comment without changing status.
    ///
    /// # Errors
    ///
    /// * `CommentRequired` if the text is blank
    /// * `NotFound` if the request is unknown
    /// * `NotAuthorized` unless the actor is the requester, the approver or HR
    pub fn comment(
        &self,
        id: LeaveRequestId,
        actor: &ActorContext,
        text: String,
    ) -> Result<ChronologyEntry, LeaveError> {
        if text.trim().is_empty() {
            return Err(LeaveError::CommentRequired);
        }
        let now = self.clock.now();

        let request = self
            .store
            .requests
            .get(&id)
            .ok_or_else(|| LeaveError::request_not_found(id))?;
        LifecycleService::authorize_comment(&request, actor)?;
        let entry = ChronologyEntry::new(
            id,
            ChronologyAction::Commented,
            Actor::Employee(actor.employee_id),
            Some(text),
            now,
        )
        .with_metadata(serde_json::json!({ "status": request.status }));
        self.store.append_chronology(entry.clone());
        Ok(entry)
    }

    /// Looks up a request.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request is unknown.
    pub fn get(&self, id: LeaveRequestId) -> Result<LeaveRequest, LeaveError> {
        self.store
            .requests
            .get(&id)
            .map(|r| r.clone())
            .ok_or_else(|| LeaveError::request_not_found(id))
    }

    /// Chronology of a request, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request is unknown.
    pub fn chronology(&self, id: LeaveRequestId) -> Result<Vec<ChronologyEntry>, LeaveError> {
        if !self.store.requests.contains_key(&id) {
            return Err(LeaveError::request_not_found(id));
        }
        let mut entries = self
            .store
            .chronology
            .get(&id)
            .map(|e| e.clone())
            .unwrap_or_default();
        entries.sort_by_key(|e| e.recorded_at);
        Ok(entries)
    }

    /// An employee's requests, newest first.
    #[must_use]
    pub fn list_for_employee(&self, employee: EmployeeId, filter: &RequestFilter) -> Vec<LeaveRequest> {
        let mut requests = self
            .store
            .requests_where(|r| r.employee_id == employee && filter.matches(r));
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }

    /// Requests of a manager's direct reports, newest first.
    #[must_use]
    pub fn team_requests(&self, manager: EmployeeId, filter: &RequestFilter) -> Vec<LeaveRequest> {
        let team = self.directory.direct_reports(manager);
        let mut requests = self
            .store
            .requests_where(|r| team.contains(&r.employee_id) && filter.matches(r));
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }

    /// Pending requests filed before `cutoff`, oldest first.
    #[must_use]
    pub fn pending_created_before(&self, cutoff: DateTime<Utc>) -> Vec<LeaveRequest> {
        let mut requests = self
            .store
            .requests_where(|r| r.status == LeaveStatus::Pending && r.created_at < cutoff);
        requests.sort_by_key(|r| r.created_at);
        requests
    }

    /// Approved requests covering any day of `[from, to]`.
    #[must_use]
    pub fn approved_overlapping(&self, from: NaiveDate, to: NaiveDate) -> Vec<LeaveRequest> {
        self.store
            .requests_where(|r| r.status == LeaveStatus::Approved && r.overlaps(from, to))
    }

    fn commit(&self, request: &mut LeaveRequest, action: &LifecycleAction) -> LeaveRequest {
        action.apply(request);
        self.store.append_chronology(action.chronology_entry(request));
        request.clone()
    }
}
