//! Property-based tests for `EntitlementCalculator`.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::calendar::{HolidayRegistry, PublicHoliday};
use crate::collaborators::EntitlementConfigStore;
use crate::entitlement::calculator::EntitlementCalculator;
use crate::entitlement::types::{DayCountRule, EntitlementConfig, EntitlementConfigUpdate, LeaveType};
use crate::error::LeaveError;

/// Store with no rows: every lookup falls back to the built-in table.
struct EmptyStore;

impl EntitlementConfigStore for EmptyStore {
    fn get(&self, leave_type: LeaveType) -> Result<EntitlementConfig, LeaveError> {
        Err(LeaveError::ConfigurationMissing(leave_type))
    }

    fn list(&self) -> Vec<EntitlementConfig> {
        Vec::new()
    }

    fn update(
        &self,
        leave_type: LeaveType,
        _update: &EntitlementConfigUpdate,
    ) -> Result<EntitlementConfig, LeaveError> {
        Err(LeaveError::ConfigurationMissing(leave_type))
    }

    fn seed_defaults_if_empty(&self) -> usize {
        0
    }
}

/// Strategy for dates between 2015 and 2034.
fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0u64..7300).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2015, 1, 1)
            .and_then(|d| d.checked_add_days(Days::new(offset)))
            .unwrap()
    })
}

fn arb_holidays() -> impl Strategy<Value = Vec<NaiveDate>> {
    prop::collection::vec(arb_date(), 0..20)
}

fn calculator(holidays: &[NaiveDate]) -> EntitlementCalculator {
    let registry = HolidayRegistry::with_holidays(
        holidays
            .iter()
            .map(|d| PublicHoliday::nationwide("Holiday", *d)),
    );
    EntitlementCalculator::new(Arc::new(registry), Arc::new(EmptyStore))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Working days never exceed calendar days, and calendar days equal the span length.
    #[test]
    fn prop_working_days_bounded_by_calendar_days(
        start in arb_date(),
        len in 0u64..60,
        holidays in arb_holidays(),
    ) {
        let end = start.checked_add_days(Days::new(len)).unwrap();
        let calc = calculator(&holidays);

        let calendar = calc.count_days(DayCountRule::CalendarDays, start, end, None);
        let working = calc.count_days(DayCountRule::WorkingDays, start, end, None);

        prop_assert_eq!(calendar, Decimal::from(len + 1));
        prop_assert!(working >= Decimal::ZERO);
        prop_assert!(working <= calendar);
    }

    /// Adding a holiday never increases the working-day count.
    #[test]
    fn prop_holidays_only_reduce_duration(
        start in arb_date(),
        len in 0u64..30,
        holiday in arb_date(),
    ) {
        let end = start.checked_add_days(Days::new(len)).unwrap();
        let without = calculator(&[]).count_days(DayCountRule::WorkingDays, start, end, None);
        let with = calculator(&[holiday]).count_days(DayCountRule::WorkingDays, start, end, None);
        prop_assert!(with <= without);
        prop_assert!(without - with <= Decimal::ONE);
    }

    /// Prorated quota lies between zero and the full quota.
    #[test]
    fn prop_prorated_quota_bounded(joined in arb_date(), year in 2015i32..2035) {
        let calc = calculator(&[]);
        let quota = calc.annual_quota(LeaveType::Annual, joined, year);
        prop_assert!(quota >= Decimal::ZERO);
        prop_assert!(quota <= dec!(16));
    }

    /// Joining earlier never yields a smaller quota.
    #[test]
    fn prop_quota_monotonic_in_join_date(a in arb_date(), b in arb_date(), year in 2015i32..2035) {
        let (earlier, later) = if a <= b { (a, b) } else { (b, a) };
        let calc = calculator(&[]);
        prop_assert!(
            calc.annual_quota(LeaveType::Annual, earlier, year)
                >= calc.annual_quota(LeaveType::Annual, later, year)
        );
    }

    /// Tenure grows by at most one year per calendar year.
    #[test]
    fn prop_tenure_steps_by_one(joined in arb_date(), year in 2015i32..2035) {
        let this_year = EntitlementCalculator::tenure_years(joined, year);
        let next_year = EntitlementCalculator::tenure_years(joined, year + 1);
        prop_assert!(next_year >= this_year);
        prop_assert!(next_year - this_year <= 1);
    }
}
