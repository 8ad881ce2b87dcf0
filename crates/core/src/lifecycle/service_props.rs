//! Property-based tests for `LifecycleService`.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal_macros::dec;
use uuid::Uuid;

use leavewise_shared::EmployeeId;

use crate::collaborators::{ActorContext, EmployeeRole};
use crate::entitlement::LeaveType;
use crate::error::LeaveError;
use crate::lifecycle::service::LifecycleService;
use crate::lifecycle::types::{LeaveRequest, LeaveStatus, LeaveSubmission};

fn arb_status() -> impl Strategy<Value = LeaveStatus> {
    prop_oneof![
        Just(LeaveStatus::Pending),
        Just(LeaveStatus::Escalated),
        Just(LeaveStatus::Approved),
        Just(LeaveStatus::Rejected),
        Just(LeaveStatus::Cancelled),
    ]
}

fn arb_terminal_status() -> impl Strategy<Value = LeaveStatus> {
    prop_oneof![
        Just(LeaveStatus::Approved),
        Just(LeaveStatus::Rejected),
        Just(LeaveStatus::Cancelled),
    ]
}

fn arb_role() -> impl Strategy<Value = EmployeeRole> {
    prop_oneof![
        Just(EmployeeRole::Staff),
        Just(EmployeeRole::Manager),
        Just(EmployeeRole::Hr),
        Just(EmployeeRole::Admin),
        Just(EmployeeRole::SysAdmin),
    ]
}

fn arb_employee() -> impl Strategy<Value = EmployeeId> {
    any::<u128>().prop_map(|n| EmployeeId::from_uuid(Uuid::from_u128(n)))
}

fn is_invalid<T>(result: Result<T, LeaveError>) -> bool {
    matches!(result, Err(LeaveError::InvalidTransition { .. }))
}

fn request_in(status: LeaveStatus, approver: EmployeeId) -> LeaveRequest {
    let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let submission = LeaveSubmission::new(EmployeeId::new(), LeaveType::Annual, day, day);
    let mut request = LeaveRequest::from_submission(submission, dec!(1), Utc::now());
    request.status = status;
    request.approver_id = Some(approver);
    request
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// No action leaves a terminal state, whoever attempts it.
    #[test]
    fn prop_terminal_states_are_final(
        status in arb_terminal_status(),
        role in arb_role(),
        approver in arb_employee(),
    ) {
        let request = request_in(status, approver);
        let by_approver = ActorContext { employee_id: approver, role };
        let by_owner = ActorContext { employee_id: request.employee_id, role };

        prop_assert!(is_invalid(LifecycleService::approve(&request, &by_approver, None, Utc::now())));
        prop_assert!(is_invalid(LifecycleService::reject(&request, &by_approver, "no".into(), Utc::now())));
        prop_assert!(is_invalid(LifecycleService::cancel(&request, &by_owner, None, Utc::now())));
        prop_assert!(is_invalid(LifecycleService::escalate(&request, 7, Utc::now())));
    }

    /// A successful action always lands on a state reachable from the current one.
    #[test]
    fn prop_actions_follow_transition_table(
        status in arb_status(),
        role in arb_role(),
        approver in arb_employee(),
    ) {
        let request = request_in(status, approver);
        let by_approver = ActorContext { employee_id: approver, role };
        let by_owner = ActorContext { employee_id: request.employee_id, role };

        let outcomes = [
            LifecycleService::approve(&request, &by_approver, None, Utc::now()).ok(),
            LifecycleService::reject(&request, &by_approver, "clash".into(), Utc::now()).ok(),
            LifecycleService::cancel(&request, &by_owner, None, Utc::now()).ok(),
            LifecycleService::escalate(&request, 7, Utc::now()).ok().flatten(),
        ];
        for action in outcomes.into_iter().flatten() {
            prop_assert!(LifecycleService::is_valid_transition(status, action.new_status()));
        }
    }

    /// Only the requester can cancel, and only while Pending.
    #[test]
    fn prop_cancel_requires_pending_and_owner(
        status in arb_status(),
        role in arb_role(),
        stranger in arb_employee(),
    ) {
        let request = request_in(status, EmployeeId::new());
        let by_owner = ActorContext { employee_id: request.employee_id, role };
        let by_stranger = ActorContext { employee_id: stranger, role };

        let owner_result = LifecycleService::cancel(&request, &by_owner, None, Utc::now());
        prop_assert_eq!(owner_result.is_ok(), status == LeaveStatus::Pending);
        prop_assert!(LifecycleService::cancel(&request, &by_stranger, None, Utc::now()).is_err());
    }

    /// Escalating twice never produces a second action.
    #[test]
    fn prop_escalation_idempotent(days in 1u32..60) {
        let mut request = request_in(LeaveStatus::Pending, EmployeeId::new());
        if let Ok(Some(action)) = LifecycleService::escalate(&request, days, Utc::now()) {
            action.apply(&mut request);
        }
        prop_assert_eq!(request.status, LeaveStatus::Escalated);
        prop_assert_eq!(LifecycleService::escalate(&request, days, Utc::now()), Ok(None));
    }
}
