//! Per-employee, per-type, per-year balance rows.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use leavewise_shared::EmployeeId;

use crate::entitlement::LeaveType;

/// Identity of a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceKey {
    /// Owning employee.
    pub employee_id: EmployeeId,
    /// Leave type.
    pub leave_type: LeaveType,
    /// Calendar year.
    pub year: i32,
}

impl BalanceKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(employee_id: EmployeeId, leave_type: LeaveType, year: i32) -> Self {
        Self {
            employee_id,
            leave_type,
            year,
        }
    }

    /// The same employee and type one year later.
    #[must_use]
    pub const fn next_year(&self) -> Self {
        Self::new(self.employee_id, self.leave_type, self.year + 1)
    }
}

impl fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.employee_id, self.leave_type, self.year)
    }
}

/// Ledger row: the account requests are debited from.
///
/// `version` starts at 1 and increases on every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBalance {
    /// Owning employee.
    pub employee_id: EmployeeId,
    /// Leave type.
    pub leave_type: LeaveType,
    /// Calendar year.
    pub year: i32,
    /// Days granted for the year.
    pub entitlement: Decimal,
    /// Days consumed by approved requests.
    pub used: Decimal,
    /// Days carried in from the previous year.
    pub carried_forward: Decimal,
    /// Manual adjustment, positive or negative.
    pub adjustment: Decimal,
    /// Set once an administrator has overridden the row.
    pub manual_override: bool,
    /// Set once year-end carry-forward has credited this row.
    pub carry_forward_applied: bool,
    /// Mutation counter.
    pub version: u64,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row last changed.
    pub updated_at: DateTime<Utc>,
}

impl LeaveBalance {
    /// Creates a fresh row with the default entitlement and nothing used.
    #[must_use]
    pub fn opening(key: BalanceKey, entitlement: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            employee_id: key.employee_id,
            leave_type: key.leave_type,
            year: key.year,
            entitlement,
            used: Decimal::ZERO,
            carried_forward: Decimal::ZERO,
            adjustment: Decimal::ZERO,
            manual_override: false,
            carry_forward_applied: false,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// This row's key.
    #[must_use]
    pub const fn key(&self) -> BalanceKey {
        BalanceKey::new(self.employee_id, self.leave_type, self.year)
    }

    /// `entitlement + carried_forward + adjustment - used`.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.entitlement + self.carried_forward + self.adjustment - self.used
    }

    /// Unused days of this year's own grant, ignoring anything carried in.
    #[must_use]
    pub fn unused_own_entitlement(&self) -> Decimal {
        self.entitlement + self.adjustment - self.used
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}
