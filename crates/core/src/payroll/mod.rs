//! Read-only projection of approved leave for payroll.
//!
//! A request wholly inside the period contributes the duration charged when it
//! was submitted. One that straddles the boundary contributes only the days
//! that fall inside the period, never more than its charged duration.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use leavewise_shared::{EmployeeId, LeaveRequestId};

use crate::collaborators::IdentityProvider;
use crate::entitlement::{EntitlementCalculator, LeaveType};
use crate::lifecycle::{LeaveRequest, LeaveStatus};

/// Inclusive date window a payroll run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollPeriod {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl PayrollPeriod {
    /// One calendar month. `None` for an invalid month.
    #[must_use]
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            start,
            end: next.pred_opt()?,
        })
    }

    /// One calendar year.
    #[must_use]
    pub fn year(year: i32) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
        })
    }
}

/// One approved request as seen by payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollLine {
    /// Source request.
    pub request_id: LeaveRequestId,
    /// Employee on leave.
    pub employee_id: EmployeeId,
    /// Type of leave.
    pub leave_type: LeaveType,
    /// First day inside the period.
    pub from: NaiveDate,
    /// Last day inside the period.
    pub to: NaiveDate,
    /// Chargeable days inside the period.
    pub days: Decimal,
    /// False for unpaid leave.
    pub paid: bool,
}

/// Projects approved requests onto payroll periods.
pub struct PayrollProjector<'a> {
    calculator: &'a EntitlementCalculator,
    directory: &'a dyn IdentityProvider,
}

impl<'a> PayrollProjector<'a> {
    /// Creates a projector.
    #[must_use]
    pub fn new(calculator: &'a EntitlementCalculator, directory: &'a dyn IdentityProvider) -> Self {
        Self {
            calculator,
            directory,
        }
    }

    /// Lines for every approved request overlapping `period`, ordered by
    /// employee then start date.
    #[must_use]
    pub fn project<'r>(
        &self,
        requests: impl IntoIterator<Item = &'r LeaveRequest>,
        period: PayrollPeriod,
    ) -> Vec<PayrollLine> {
        let mut lines: Vec<PayrollLine> = requests
            .into_iter()
            .filter(|r| r.status == LeaveStatus::Approved && r.overlaps(period.start, period.end))
            .map(|r| self.line(r, period))
            .collect();
        lines.sort_by(|a, b| {
            a.employee_id
                .cmp(&b.employee_id)
                .then_with(|| a.from.cmp(&b.from))
        });
        lines
    }

    fn line(&self, request: &LeaveRequest, period: PayrollPeriod) -> PayrollLine {
        let from = request.start_date.max(period.start);
        let to = request.end_date.min(period.end);
        let days = if from == request.start_date && to == request.end_date {
            request.duration
        } else {
            self.clipped_days(request, from, to).min(request.duration)
        };

        PayrollLine {
            request_id: request.id,
            employee_id: request.employee_id,
            leave_type: request.leave_type,
            from,
            to,
            days,
            paid: request.leave_type != LeaveType::Unpaid,
        }
    }

    fn clipped_days(&self, request: &LeaveRequest, from: NaiveDate, to: NaiveDate) -> Decimal {
        let region = self
            .directory
            .employee(request.employee_id)
            .ok()
            .and_then(|e| e.region);
        let rule = self.calculator.policy(request.leave_type).day_count;
        self.calculator.count_days(rule, from, to, region.as_deref()) * request.day_portion.factor()
    }
}
