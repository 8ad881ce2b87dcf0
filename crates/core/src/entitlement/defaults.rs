//! Built-in policy tables.
//!
//! Two distinct tables exist and both must be kept exactly as they are for
//! continuity of existing balances:
//! - the *seed* table written into an empty config store, and
//! - the *fallback* table used when the store has no row for a type.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::types::{DayCountRule, EntitlementConfig, LeaveType};

/// Leave types debited from the ledger by default.
#[must_use]
pub fn is_balance_bearing_by_default(leave_type: LeaveType) -> bool {
    matches!(
        leave_type,
        LeaveType::Annual | LeaveType::Sick | LeaveType::Emergency
    )
}

/// Day counting rule for a leave type by default.
#[must_use]
pub fn default_day_count(leave_type: LeaveType) -> DayCountRule {
    match leave_type {
        LeaveType::Maternity | LeaveType::Paternity => DayCountRule::CalendarDays,
        _ => DayCountRule::WorkingDays,
    }
}

fn skeleton(leave_type: LeaveType, base: i64, display_order: u32) -> EntitlementConfig {
    EntitlementConfig {
        balance_bearing: is_balance_bearing_by_default(leave_type),
        day_count: default_day_count(leave_type),
        requires_sub_type: leave_type == LeaveType::Special,
        display_order,
        ..EntitlementConfig::new(leave_type, Decimal::from(base))
    }
}

fn tiers(pairs: &[(u32, i64)]) -> BTreeMap<u32, Decimal> {
    pairs
        .iter()
        .map(|&(years, bonus)| (years, Decimal::from(bonus)))
        .collect()
}

/// Rows written by `seed_defaults_if_empty`.
#[must_use]
pub fn seed_configs() -> Vec<EntitlementConfig> {
    LeaveType::ALL
        .iter()
        .zip(1..)
        .map(|(&leave_type, order)| seed_config(leave_type, order))
        .collect()
}

fn seed_config(leave_type: LeaveType, order: u32) -> EntitlementConfig {
    match leave_type {
        LeaveType::Annual => EntitlementConfig {
            tenure_tiers: tiers(&[(2, 4), (5, 8)]),
            prorate_first_year: true,
            allow_carry_forward: true,
            max_carry_forward_days: Decimal::from(5),
            ..skeleton(leave_type, 12, order)
        },
        LeaveType::Sick => EntitlementConfig {
            tenure_tiers: tiers(&[(2, 4), (5, 8)]),
            requires_attachment: true,
            ..skeleton(leave_type, 14, order)
        },
        LeaveType::Maternity => EntitlementConfig {
            requires_attachment: true,
            ..skeleton(leave_type, 98, order)
        },
        LeaveType::Paternity => skeleton(leave_type, 7, order),
        LeaveType::Emergency => skeleton(leave_type, 3, order),
        LeaveType::Unpaid | LeaveType::Special => skeleton(leave_type, 0, order),
        LeaveType::Hospitalization => EntitlementConfig {
            requires_attachment: true,
            ..skeleton(leave_type, 60, order)
        },
    }
}

/// Policy used when the config store has no row for `leave_type`.
///
/// Annual: 12 days, 16 from five years. Sick: 14, 18 from two years, 22 from
/// five. Maternity 98, paternity 7, hospitalization 60, everything else 0.
#[must_use]
pub fn fallback_config(leave_type: LeaveType) -> EntitlementConfig {
    let order = LeaveType::ALL
        .iter()
        .position(|t| *t == leave_type)
        .and_then(|i| u32::try_from(i + 1).ok())
        .unwrap_or_default();

    match leave_type {
        LeaveType::Annual => EntitlementConfig {
            tenure_tiers: tiers(&[(5, 4)]),
            prorate_first_year: true,
            allow_carry_forward: true,
            max_carry_forward_days: Decimal::from(5),
            ..skeleton(leave_type, 12, order)
        },
        LeaveType::Sick => EntitlementConfig {
            tenure_tiers: tiers(&[(2, 4), (5, 4)]),
            ..skeleton(leave_type, 14, order)
        },
        LeaveType::Maternity => skeleton(leave_type, 98, order),
        LeaveType::Paternity => skeleton(leave_type, 7, order),
        LeaveType::Hospitalization => skeleton(leave_type, 60, order),
        LeaveType::Emergency | LeaveType::Unpaid | LeaveType::Special => {
            skeleton(leave_type, 0, order)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(LeaveType::Annual, 0, dec!(12))]
    #[case(LeaveType::Annual, 1, dec!(12))]
    #[case(LeaveType::Annual, 4, dec!(12))]
    #[case(LeaveType::Annual, 5, dec!(16))]
    #[case(LeaveType::Sick, 1, dec!(14))]
    #[case(LeaveType::Sick, 2, dec!(18))]
    #[case(LeaveType::Sick, 4, dec!(18))]
    #[case(LeaveType::Sick, 5, dec!(22))]
    #[case(LeaveType::Maternity, 3, dec!(98))]
    #[case(LeaveType::Paternity, 3, dec!(7))]
    #[case(LeaveType::Hospitalization, 3, dec!(60))]
    #[case(LeaveType::Emergency, 3, dec!(0))]
    #[case(LeaveType::Unpaid, 3, dec!(0))]
    fn test_fallback_table(
        #[case] leave_type: LeaveType,
        #[case] tenure: u32,
        #[case] expected: Decimal,
    ) {
        let config = fallback_config(leave_type);
        assert_eq!(config.base_entitlement + config.tier_bonus(tenure), expected);
    }

    #[test]
    fn test_seed_table_covers_every_type_once() {
        let seeds = seed_configs();
        assert_eq!(seeds.len(), LeaveType::ALL.len());
        for (seed, leave_type) in seeds.iter().zip(LeaveType::ALL) {
            assert_eq!(seed.leave_type, leave_type);
        }
    }

    #[test]
    fn test_seed_annual_row() {
        let annual = seed_config(LeaveType::Annual, 1);
        assert_eq!(annual.base_entitlement + annual.tier_bonus(5), dec!(24));
        assert_eq!(annual.carry_forward_cap(), Some(dec!(5)));
        assert!(annual.prorate_first_year);
    }

    #[test]
    fn test_default_flags() {
        assert!(is_balance_bearing_by_default(LeaveType::Emergency));
        assert!(!is_balance_bearing_by_default(LeaveType::Hospitalization));
        assert_eq!(
            default_day_count(LeaveType::Paternity),
            DayCountRule::CalendarDays
        );
        assert!(fallback_config(LeaveType::Special).requires_sub_type);
        assert!(seed_config(LeaveType::Sick, 2).requires_attachment);
    }
}
