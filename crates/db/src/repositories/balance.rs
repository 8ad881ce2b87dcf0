//! Balance ledger repository.
//!
//! Rows are created lazily the first time they are read, with the default
//! entitlement for the employee's tenure. Every mutation holds the row's
//! entry guard for its whole read-check-write.

use std::sync::Arc;

use rust_decimal::Decimal;

use leavewise_core::LeaveError;
use leavewise_core::collaborators::{ActorContext, AuditRecord, IdentityProvider};
use leavewise_core::entitlement::{EntitlementCalculator, LeaveType};
use leavewise_core::events::EventOutbox;
use leavewise_core::ledger::{
    BalanceKey, BalanceOverride, CarryForwardOutcome, LeaveBalance, LedgerService,
};
use leavewise_shared::{AuditRecordId, Clock, EmployeeId};

use crate::store::LeaveStore;

/// Ledger rows, keyed by (employee, leave type, year).
#[derive(Clone)]
pub struct BalanceRepository {
    store: Arc<LeaveStore>,
    calculator: Arc<EntitlementCalculator>,
    directory: Arc<dyn IdentityProvider>,
    outbox: EventOutbox,
    clock: Arc<dyn Clock>,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub fn new(
        store: Arc<LeaveStore>,
        calculator: Arc<EntitlementCalculator>,
        directory: Arc<dyn IdentityProvider>,
        outbox: EventOutbox,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            calculator,
            directory,
            outbox,
            clock,
        }
    }

    /// Row for `key` as it would be created today.
    ///
    /// Built before any guard is taken; only inserted if the row is absent.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the employee is unknown.
    pub(crate) fn opening_row(&self, key: BalanceKey) -> Result<LeaveBalance, LeaveError> {
        let employee = self.directory.employee(key.employee_id)?;
        let entitlement =
            self.calculator
                .annual_quota(key.leave_type, employee.joined_date, key.year);
        Ok(LeaveBalance::opening(key, entitlement, self.clock.now()))
    }

    /// Current row for `key`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the employee is unknown.
    pub fn get(&self, key: BalanceKey) -> Result<LeaveBalance, LeaveError> {
        if let Some(row) = self.store.balances.get(&key) {
            return Ok(row.clone());
        }
        let opening = self.opening_row(key)?;
        let row = self.store.balances.entry(key).or_insert(opening);
        Ok(row.clone())
    }

    /// Rows of every balance-bearing type for `employee` in `year`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the employee is unknown.
    pub fn balances_for(&self, employee: EmployeeId, year: i32) -> Result<Vec<LeaveBalance>, LeaveError> {
        LeaveType::ALL
            .iter()
            .filter(|lt| self.calculator.policy(**lt).balance_bearing)
            .map(|lt| self.get(BalanceKey::new(employee, *lt, year)))
            .collect()
    }

    /// Snapshot of the existing rows of `leave_type` for `year`.
    #[must_use]
    pub fn rows_for_year(&self, leave_type: LeaveType, year: i32) -> Vec<LeaveBalance> {
        let mut rows: Vec<LeaveBalance> = self
            .store
            .balances
            .iter()
            .filter(|r| r.leave_type == leave_type && r.year == year)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(LeaveBalance::key);
        rows
    }

    /// Replaces a row's entitlement and adjustment on behalf of HR.
    ///
    /// Skips the sufficiency check and queues an audit record with the row
    /// before and after the change.
    ///
    /// # Errors
    ///
    /// * `NotAuthorized` unless the actor is HR or above
    /// * `ReasonRequired` or `NegativeAmount` from the override itself
    /// * `NotFound` if the employee is unknown
    pub fn override_balance(
        &self,
        actor: &ActorContext,
        key: BalanceKey,
        change: &BalanceOverride,
    ) -> Result<LeaveBalance, LeaveError> {
        if !actor.role.is_hr_or_above() {
            return Err(LeaveError::NotAuthorized {
                actor: actor.employee_id,
                action: "override balance",
            });
        }
        let opening = self.opening_row(key)?;
        let now = self.clock.now();

        let (before, after) = {
            let mut row = self.store.balances.entry(key).or_insert(opening);
            let before = row.clone();
            LedgerService::apply_override(&mut row, change, now)?;
            (before, row.clone())
        };

        tracing::info!(
            balance = %key,
            actor = %actor.employee_id,
            entitlement = %after.entitlement,
            adjustment = %after.adjustment,
            "Balance overridden"
        );
        self.outbox.audit(AuditRecord {
            id: AuditRecordId::new(),
            actor: actor.employee_id,
            action: "balance.override".to_string(),
            target: key.to_string(),
            before: serde_json::to_value(&before).unwrap_or_default(),
            after: serde_json::to_value(&after).unwrap_or_default(),
            reason: Some(change.reason.clone()),
            recorded_at: now,
        });
        Ok(after)
    }

    /// Sets the carried-forward days of the row at `next_key` to `amount`.
    ///
    /// The row is created with its own entitlement for that year if absent.
    /// A zero amount never opens a row, but clears an earlier credit. Returns
    /// `None` when there was nothing to record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the employee is unknown.
    pub fn apply_carry_forward(
        &self,
        next_key: BalanceKey,
        amount: Decimal,
    ) -> Result<Option<CarryForwardOutcome>, LeaveError> {
        let now = self.clock.now();
        if amount <= Decimal::ZERO {
            return Ok(self
                .store
                .balances
                .get_mut(&next_key)
                .filter(|row| row.carry_forward_applied)
                .map(|mut row| LedgerService::apply_carry_forward(&mut row, Decimal::ZERO, now)));
        }

        let opening = self.opening_row(next_key)?;
        let mut row = self.store.balances.entry(next_key).or_insert(opening);
        Ok(Some(LedgerService::apply_carry_forward(&mut row, amount, now)))
    }
}
