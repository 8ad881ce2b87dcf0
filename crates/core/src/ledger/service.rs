//! Balance ledger arithmetic.
//!
//! Pure functions over a single row. Callers hold the row's lock for the
//! whole read-check-write so the sufficiency check and the debit see the
//! same values.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::balance::LeaveBalance;
use crate::error::LeaveError;

/// Administrative replacement of a row's grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceOverride {
    /// New entitlement.
    pub entitlement: Decimal,
    /// New adjustment (may be negative).
    pub adjustment: Decimal,
    /// Why the override was made.
    pub reason: String,
}

/// Stateless ledger operations.
pub struct LedgerService;

impl LedgerService {
    /// Check that `requested` days fit in the row.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` if `available < requested`.
    pub fn ensure_sufficient(balance: &LeaveBalance, requested: Decimal) -> Result<(), LeaveError> {
        let available = balance.available();
        if available < requested {
            return Err(LeaveError::InsufficientBalance {
                available,
                requested,
            });
        }
        Ok(())
    }

    /// Consume `amount` days.
    ///
    /// Leaves the row untouched on error.
    ///
    /// # Errors
    ///
    /// * `NegativeAmount` if `amount` is negative
    /// * `InsufficientBalance` if the debit would drive `available` below zero
    pub fn debit(
        balance: &mut LeaveBalance,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), LeaveError> {
        if amount < Decimal::ZERO {
            return Err(LeaveError::NegativeAmount(amount));
        }
        Self::ensure_sufficient(balance, amount)?;
        balance.used += amount;
        balance.touch(now);
        Ok(())
    }

    /// Replace the grant of a row, bypassing the sufficiency check.
    ///
    /// The result may leave `available` negative.
    ///
    /// # Errors
    ///
    /// * `ReasonRequired` if the reason is blank
    /// * `NegativeAmount` if the new entitlement is negative
    pub fn apply_override(
        balance: &mut LeaveBalance,
        change: &BalanceOverride,
        now: DateTime<Utc>,
    ) -> Result<(), LeaveError> {
        if change.reason.trim().is_empty() {
            return Err(LeaveError::ReasonRequired);
        }
        if change.entitlement < Decimal::ZERO {
            return Err(LeaveError::NegativeAmount(change.entitlement));
        }
        balance.entitlement = change.entitlement;
        balance.adjustment = change.adjustment;
        balance.manual_override = true;
        balance.touch(now);
        Ok(())
    }

    /// Days `balance` carries into next year under `cap`.
    ///
    /// Only this year's own unused grant counts; days carried in are not
    /// carried again.
    #[must_use]
    pub fn carry_forward_amount(balance: &LeaveBalance, cap: Decimal) -> Decimal {
        balance
            .unused_own_entitlement()
            .min(cap)
            .max(Decimal::ZERO)
    }

    /// Set next year's carried-forward amount from the closing year.
    ///
    /// Re-running with a recomputed amount replaces the previous credit, so
    /// approvals or cancellations landing after year end are reflected.
    pub fn apply_carry_forward(
        next_year: &mut LeaveBalance,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> CarryForwardOutcome {
        let amount = amount.max(Decimal::ZERO);
        if next_year.carry_forward_applied && next_year.carried_forward == amount {
            return CarryForwardOutcome::Unchanged;
        }
        let outcome = if next_year.carry_forward_applied {
            CarryForwardOutcome::Corrected {
                previous: next_year.carried_forward,
            }
        } else {
            CarryForwardOutcome::Credited
        };
        next_year.carried_forward = amount;
        next_year.carry_forward_applied = true;
        next_year.touch(now);
        outcome
    }
}

/// What a carry-forward pass did to next year's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryForwardOutcome {
    /// First credit for this row.
    Credited,
    /// An earlier credit was replaced.
    Corrected {
        /// Amount carried before this pass.
        previous: Decimal,
    },
    /// Already carrying exactly this amount.
    Unchanged,
}
