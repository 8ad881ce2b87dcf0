//! Property-based tests for `LedgerService`.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use leavewise_shared::EmployeeId;

use super::balance::{BalanceKey, LeaveBalance};
use super::service::LedgerService;
use crate::entitlement::LeaveType;

/// Strategy for half-day granular amounts (0.0 to 30.0).
fn half_days() -> impl Strategy<Value = Decimal> {
    (0i64..=60).prop_map(|halves| Decimal::new(halves * 5, 1))
}

fn opening(entitlement: Decimal) -> LeaveBalance {
    let key = BalanceKey::new(EmployeeId::new(), LeaveType::Annual, 2025);
    LeaveBalance::opening(key, entitlement, Utc::now())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// No sequence of debits drives `available` below zero.
    #[test]
    fn prop_debits_never_overdraw(
        entitlement in half_days(),
        debits in prop::collection::vec(half_days(), 0..20),
    ) {
        let mut balance = opening(entitlement);
        let mut debited = Decimal::ZERO;

        for amount in debits {
            if LedgerService::debit(&mut balance, amount, Utc::now()).is_ok() {
                debited += amount;
            }
            prop_assert!(balance.available() >= Decimal::ZERO);
        }
        prop_assert_eq!(balance.used, debited);
    }

    /// A failed debit changes nothing, version included.
    #[test]
    fn prop_failed_debit_is_noop(entitlement in half_days(), extra in 1i64..20) {
        let mut balance = opening(entitlement);
        let before = balance.clone();
        let amount = entitlement + Decimal::from(extra);
        prop_assert!(LedgerService::debit(&mut balance, amount, Utc::now()).is_err());
        prop_assert_eq!(balance, before);
    }

    /// Carry-forward is within `[0, cap]` and never exceeds the unused own grant.
    #[test]
    fn prop_carry_forward_bounded(
        entitlement in half_days(),
        used in half_days(),
        carried in half_days(),
        cap in half_days(),
    ) {
        let mut balance = opening(entitlement);
        balance.used = used;
        balance.carried_forward = carried;

        let amount = LedgerService::carry_forward_amount(&balance, cap);
        prop_assert!(amount >= Decimal::ZERO);
        prop_assert!(amount <= cap);
        prop_assert!(amount <= (entitlement - used).max(Decimal::ZERO));
    }

    /// Every successful mutation bumps the version by exactly one.
    #[test]
    fn prop_version_counts_mutations(debits in prop::collection::vec(half_days(), 0..10)) {
        let mut balance = opening(Decimal::from(100));
        let mut applied = 0u64;
        for amount in debits {
            if LedgerService::debit(&mut balance, amount, Utc::now()).is_ok() {
                applied += 1;
            }
        }
        prop_assert_eq!(balance.version, 1 + applied);
    }
}
