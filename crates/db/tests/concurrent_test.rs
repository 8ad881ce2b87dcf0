//! Concurrent access tests for the lifecycle engine.
//!
//! These tests verify that:
//! - Racing approvals of one request produce exactly one winner
//! - Racing approvals of different requests never overdraw a shared ledger row
//! - Approvals against unrelated rows proceed independently without drift

#![allow(clippy::items_after_statements)]

use std::sync::Arc;

use chrono::{Days, NaiveDate, TimeZone, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use leavewise_core::LeaveError;
use leavewise_core::calendar::HolidayRegistry;
use leavewise_core::collaborators::{EmployeeProfile, EntitlementConfigStore};
use leavewise_core::entitlement::{EntitlementCalculator, LeaveType};
use leavewise_core::events::EventOutbox;
use leavewise_core::ledger::BalanceKey;
use leavewise_core::lifecycle::{ChronologyAction, LeaveStatus, LeaveSubmission};
use leavewise_db::{
    BalanceRepository, InMemoryEmployeeDirectory, InMemoryEntitlementConfigStore, LeaveRepository,
    LeaveStore,
};
use leavewise_shared::{EmployeeId, LeaveRequestId, ManualClock};

struct Engine {
    leave: LeaveRepository,
    balances: BalanceRepository,
    directory: Arc<InMemoryEmployeeDirectory>,
}

fn engine() -> Engine {
    let configs = InMemoryEntitlementConfigStore::new();
    configs.seed_defaults_if_empty();
    let calculator = Arc::new(EntitlementCalculator::new(
        Arc::new(HolidayRegistry::new()),
        Arc::new(configs),
    ));
    let directory = Arc::new(InMemoryEmployeeDirectory::new());
    // Dispatcher not under test; events are dropped with the receiver.
    let (outbox, _events) = EventOutbox::channel();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
    ));
    let store = Arc::new(LeaveStore::new());
    let balances = BalanceRepository::new(
        store.clone(),
        calculator.clone(),
        directory.clone(),
        outbox.clone(),
        clock.clone(),
    );
    let leave = LeaveRepository::new(
        store,
        balances.clone(),
        calculator,
        directory.clone(),
        outbox,
        clock,
    );
    Engine {
        leave,
        balances,
        directory,
    }
}

/// Hires a manager and one report with 16 days of annual leave for 2025.
fn team(engine: &Engine) -> (EmployeeProfile, EmployeeProfile) {
    let joined = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let manager = EmployeeProfile::new("Farid Osman", joined);
    let staff = EmployeeProfile::new("Chloe Ng", joined).reporting_to(manager.id);
    engine.directory.upsert(manager.clone());
    engine.directory.upsert(staff.clone());
    (manager, staff)
}

/// Monday to Wednesday of week `week` after 2025-02-03.
fn three_day_request(employee: EmployeeId, week: u64) -> LeaveSubmission {
    let monday = NaiveDate::from_ymd_opt(2025, 2, 3)
        .unwrap()
        .checked_add_days(Days::new(7 * week))
        .unwrap();
    let wednesday = monday.checked_add_days(Days::new(2)).unwrap();
    LeaveSubmission::new(employee, LeaveType::Annual, monday, wednesday)
}

// ============================================================================
// Test: many approvers racing on one request
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_racing_approvals_have_exactly_one_winner() {
    let engine = Arc::new(engine());
    let (manager, staff) = team(&engine);
    let request = engine.leave.submit(three_day_request(staff.id, 0)).unwrap();

    const RACERS: usize = 32;
    let barrier = Arc::new(Barrier::new(RACERS));
    let mut handles = Vec::with_capacity(RACERS);

    for _ in 0..RACERS {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        let actor = manager.as_actor();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            engine.leave.approve(request.id, &actor, None)
        }));
    }

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let losers = results
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(LeaveError::InvalidTransition {
                    from: LeaveStatus::Approved,
                    ..
                })
            )
        })
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, RACERS - 1);

    let row = engine
        .balances
        .get(BalanceKey::new(staff.id, LeaveType::Annual, 2025))
        .unwrap();
    assert_eq!(row.used, dec!(3), "the ledger must be debited exactly once");

    let approvals = engine
        .leave
        .chronology(request.id)
        .unwrap()
        .iter()
        .filter(|e| e.action == ChronologyAction::Approved)
        .count();
    assert_eq!(approvals, 1);
}

// ============================================================================
// Test: different requests racing on the same ledger row
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_racing_approvals_never_overdraw_a_row() {
    let engine = Arc::new(engine());
    let (manager, staff) = team(&engine);

    // Eight 3-day requests (24 days) each fit alone against 16 days.
    const REQUESTS: u64 = 8;
    let ids: Vec<LeaveRequestId> = (0..REQUESTS)
        .map(|week| engine.leave.submit(three_day_request(staff.id, week)).unwrap().id)
        .collect();

    let barrier = Arc::new(Barrier::new(ids.len()));
    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let actor = manager.as_actor();
            tokio::spawn(async move {
                barrier.wait().await;
                engine.leave.approve(id, &actor, None)
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let approved = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(LeaveError::InsufficientBalance { .. })))
        .count();
    assert_eq!(approved, 5);
    assert_eq!(refused, 3);

    let row = engine
        .balances
        .get(BalanceKey::new(staff.id, LeaveType::Annual, 2025))
        .unwrap();
    assert_eq!(row.used, dec!(15));
    assert_eq!(row.available(), dec!(1));
    assert!(row.available() >= Decimal::ZERO);

    // Every approved request is debited and every debit belongs to an approval.
    let approved_days: Decimal = ids
        .iter()
        .map(|id| engine.leave.get(*id).unwrap())
        .filter(|r| r.status == LeaveStatus::Approved)
        .map(|r| r.duration)
        .sum();
    assert_eq!(approved_days, row.used);
    assert_eq!(row.version, 1 + approved as u64);
}

// ============================================================================
// Test: approvals across many employees proceed without drift
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_parallel_approvals_on_separate_rows() {
    let engine = Arc::new(engine());
    let joined = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let manager = EmployeeProfile::new("Farid Osman", joined);
    engine.directory.upsert(manager.clone());

    const EMPLOYEES: usize = 50;
    let mut ids = Vec::with_capacity(EMPLOYEES * 2);
    let mut staff = Vec::with_capacity(EMPLOYEES);
    for i in 0..EMPLOYEES {
        let profile =
            EmployeeProfile::new(format!("Staff {i}"), joined).reporting_to(manager.id);
        engine.directory.upsert(profile.clone());
        ids.push(engine.leave.submit(three_day_request(profile.id, 0)).unwrap().id);
        ids.push(engine.leave.submit(three_day_request(profile.id, 1)).unwrap().id);
        staff.push(profile.id);
    }

    let barrier = Arc::new(Barrier::new(ids.len()));
    let handles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            let actor = manager.as_actor();
            tokio::spawn(async move {
                barrier.wait().await;
                engine.leave.approve(id, &actor, None)
            })
        })
        .collect();

    for joined in join_all(handles).await {
        assert!(joined.unwrap().is_ok());
    }
    for employee in staff {
        let row = engine
            .balances
            .get(BalanceKey::new(employee, LeaveType::Annual, 2025))
            .unwrap();
        assert_eq!(row.used, dec!(6));
        assert_eq!(row.available(), dec!(10));
    }
}
