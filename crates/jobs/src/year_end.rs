//! Annual carry-forward and archival.
//!
//! Carry-forward runs over every existing row of each carry-forward-eligible
//! leave type for the closing year, in parallel. Each row is processed on
//! its own: one employee's failure does not affect the others. Each pass sets
//! the next-year carry from the closing row as it stands, so re-running the
//! batch never credits twice and picks up late approvals or cancellations.

use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use rayon::prelude::*;
use rust_decimal::Decimal;

use leavewise_core::collaborators::RecordArchiver;
use leavewise_core::entitlement::{EntitlementCalculator, LeaveType};
use leavewise_core::ledger::{CarryForwardOutcome, LeaveBalance, LedgerService};
use leavewise_db::BalanceRepository;
use leavewise_shared::Clock;

use crate::error::JobError;

/// Outcome of one year-end run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearEndReport {
    /// The closing year.
    pub year: i32,
    /// Rows of the closing year examined.
    pub examined: usize,
    /// Rows whose unused days were carried into next year.
    pub carried: usize,
    /// Rows whose earlier carry was replaced by a different amount.
    pub corrected: usize,
    /// Rows whose next-year row already carried the same amount.
    pub already_applied: usize,
    /// Rows with nothing left to carry.
    pub nothing_to_carry: usize,
    /// Rows that could not be processed.
    pub failed: usize,
    /// Requests archived, if archival succeeded.
    pub archived: Option<u64>,
}

enum Outcome {
    Carried,
    Corrected,
    AlreadyApplied,
    NothingToCarry,
    Failed,
}

/// Runs the annual ledger roll-over.
#[derive(Clone)]
pub struct YearEndProcessor {
    balances: BalanceRepository,
    calculator: Arc<EntitlementCalculator>,
    archiver: Arc<dyn RecordArchiver>,
    clock: Arc<dyn Clock>,
    retention_years: u32,
}

impl YearEndProcessor {
    /// Creates a processor.
    #[must_use]
    pub fn new(
        balances: BalanceRepository,
        calculator: Arc<EntitlementCalculator>,
        archiver: Arc<dyn RecordArchiver>,
        clock: Arc<dyn Clock>,
        retention_years: u32,
    ) -> Self {
        Self {
            balances,
            calculator,
            archiver,
            clock,
            retention_years,
        }
    }

    /// Carries unused days of `year` into `year + 1`.
    ///
    /// Blocks while the batch runs on the rayon pool.
    pub fn carry_forward(&self, year: i32) -> YearEndReport {
        let mut report = YearEndReport {
            year,
            ..YearEndReport::default()
        };

        for leave_type in LeaveType::ALL {
            let Some(cap) = self.calculator.policy(leave_type).carry_forward_cap() else {
                continue;
            };
            let rows = self.balances.rows_for_year(leave_type, year);
            report.examined += rows.len();

            let outcomes: Vec<Outcome> = rows
                .par_iter()
                .map(|row| self.carry_row(row, cap))
                .collect();

            for outcome in outcomes {
                match outcome {
                    Outcome::Carried => report.carried += 1,
                    Outcome::Corrected => report.corrected += 1,
                    Outcome::AlreadyApplied => report.already_applied += 1,
                    Outcome::NothingToCarry => report.nothing_to_carry += 1,
                    Outcome::Failed => report.failed += 1,
                }
            }
        }

        tracing::info!(
            year,
            examined = report.examined,
            carried = report.carried,
            corrected = report.corrected,
            already_applied = report.already_applied,
            failed = report.failed,
            "Carry-forward finished"
        );
        report
    }

    /// Archives closed requests older than the retention period.
    ///
    /// A failure is logged and reported as `None`.
    pub async fn archive(&self) -> Option<u64> {
        let cutoff = self.retention_cutoff();
        match self.archiver.archive_before(cutoff).await {
            Ok(moved) => Some(moved),
            Err(err) => {
                tracing::error!(%cutoff, error = %err, "Archival failed");
                None
            }
        }
    }

    /// Full year-end run: carry-forward on a blocking thread, then archival.
    ///
    /// # Errors
    ///
    /// Returns `JobError::Worker` if the carry-forward thread panicked.
    pub async fn run(&self, year: i32) -> Result<YearEndReport, JobError> {
        let this = self.clone();
        let mut report = tokio::task::spawn_blocking(move || this.carry_forward(year)).await?;
        report.archived = self.archive().await;
        Ok(report)
    }

    fn retention_cutoff(&self) -> DateTime<Utc> {
        self.clock
            .now()
            .checked_sub_months(Months::new(self.retention_years.saturating_mul(12)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn carry_row(&self, row: &LeaveBalance, cap: Decimal) -> Outcome {
        let amount = LedgerService::carry_forward_amount(row, cap);
        let next = row.key().next_year();
        match self.balances.apply_carry_forward(next, amount) {
            Ok(Some(CarryForwardOutcome::Credited)) => {
                tracing::debug!(balance = %next, %amount, "Carried forward");
                Outcome::Carried
            }
            Ok(Some(CarryForwardOutcome::Corrected { previous })) => {
                tracing::info!(
                    balance = %next,
                    %previous,
                    %amount,
                    source_version = row.version,
                    "Carry-forward corrected"
                );
                Outcome::Corrected
            }
            Ok(Some(CarryForwardOutcome::Unchanged)) if amount > Decimal::ZERO => {
                Outcome::AlreadyApplied
            }
            Ok(Some(CarryForwardOutcome::Unchanged) | None) => Outcome::NothingToCarry,
            Err(err) => {
                tracing::error!(
                    employee_id = %row.employee_id,
                    leave_type = %row.leave_type,
                    year = row.year,
                    error = %err,
                    error_code = err.error_code(),
                    "Carry-forward failed"
                );
                Outcome::Failed
            }
        }
    }
}
