//! Annual quota and chargeable duration.
//!
//! Policy comes from the config store. A missing row degrades to the built-in
//! fallback table so the employee-facing path never blocks on absent
//! administrative configuration.

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rust_decimal::Decimal;

use crate::calendar::HolidayCalendar;
use crate::collaborators::{EmployeeProfile, EntitlementConfigStore};
use crate::entitlement::defaults::fallback_config;
use crate::entitlement::types::{DayCountRule, EntitlementConfig, LeaveType};
use crate::error::LeaveError;
use crate::lifecycle::LeaveSubmission;

/// A validated submission priced in chargeable days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// Policy the submission was validated against.
    pub policy: EntitlementConfig,
    /// Days the request will charge, half-day portion applied.
    pub duration: Decimal,
}

/// Derives quotas and durations from policy and the holiday calendar.
#[derive(Clone)]
pub struct EntitlementCalculator {
    holidays: Arc<dyn HolidayCalendar>,
    configs: Arc<dyn EntitlementConfigStore>,
}

impl EntitlementCalculator {
    /// Creates a calculator over the given calendar and policy store.
    #[must_use]
    pub fn new(holidays: Arc<dyn HolidayCalendar>, configs: Arc<dyn EntitlementConfigStore>) -> Self {
        Self { holidays, configs }
    }

    /// Policy for `leave_type`, or the fallback row if the store has none.
    #[must_use]
    pub fn policy(&self, leave_type: LeaveType) -> EntitlementConfig {
        match self.configs.get(leave_type) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%leave_type, error = %err, "Using fallback entitlement policy");
                fallback_config(leave_type)
            }
        }
    }

    /// Completed years of service as of January 1 of `as_of_year`.
    #[must_use]
    pub fn tenure_years(joined: NaiveDate, as_of_year: i32) -> u32 {
        let mut years = as_of_year - joined.year();
        // The anniversary in `as_of_year` has not passed yet on January 1.
        if joined.ordinal() > 1 {
            years -= 1;
        }
        u32::try_from(years).unwrap_or(0)
    }

    /// Whole months of service from `joined` through the end of `as_of`.
    #[must_use]
    pub fn completed_months(joined: NaiveDate, as_of: NaiveDate) -> u32 {
        let Some(day_after) = as_of.succ_opt() else {
            return 0;
        };
        let mut months = i64::from(day_after.year() - joined.year()) * 12
            + i64::from(day_after.month())
            - i64::from(joined.month());
        if day_after.day() < joined.day() {
            months -= 1;
        }
        u32::try_from(months).unwrap_or(0)
    }

    /// Quota granted by `policy` to an employee who joined on `joined`.
    ///
    /// Base plus every reached tier bonus. In the first year of service a
    /// prorated policy scales that by the months served through December 31,
    /// rounded to two decimal places.
    #[must_use]
    pub fn quota_for(policy: &EntitlementConfig, joined: NaiveDate, year: i32) -> Decimal {
        let tenure = Self::tenure_years(joined, year);
        let full = policy.base_entitlement + policy.tier_bonus(tenure);

        if tenure > 0 || !policy.prorate_first_year {
            return full;
        }
        let Some(year_end) = NaiveDate::from_ymd_opt(year, 12, 31) else {
            return full;
        };
        let months = Self::completed_months(joined, year_end).min(12);
        (full * Decimal::from(months) / Decimal::from(12)).round_dp(2)
    }

    /// Quota for `leave_type` in `year`.
    #[must_use]
    pub fn annual_quota(&self, leave_type: LeaveType, joined: NaiveDate, year: i32) -> Decimal {
        Self::quota_for(&self.policy(leave_type), joined, year)
    }

    /// Chargeable days in `[start, end]` for `leave_type`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` if `start` is after `end`.
    pub fn chargeable_duration(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        leave_type: LeaveType,
        region: Option<&str>,
    ) -> Result<Decimal, LeaveError> {
        if start > end {
            return Err(LeaveError::InvalidDateRange { start, end });
        }
        let policy = self.policy(leave_type);
        Ok(self.count_days(policy.day_count, start, end, region))
    }

    /// Counts the days of `[start, end]` under `rule`.
    ///
    /// Empty when `start` is after `end`.
    #[must_use]
    pub fn count_days(
        &self,
        rule: DayCountRule,
        start: NaiveDate,
        end: NaiveDate,
        region: Option<&str>,
    ) -> Decimal {
        let days = start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| match rule {
                DayCountRule::CalendarDays => true,
                DayCountRule::WorkingDays => {
                    !is_weekend(*day) && !self.holidays.is_holiday(*day, region)
                }
            })
            .count();
        Decimal::from(days)
    }

    /// Checks a submission against policy and returns the policy used.
    ///
    /// Checks run in a fixed order and the first failure wins: probation,
    /// date range, past start, inactive type, missing attachment, missing
    /// sub-type, half-day span, advance notice.
    ///
    /// # Errors
    ///
    /// Returns the first failing check's error.
    pub fn validate(
        &self,
        employee: &EmployeeProfile,
        submission: &LeaveSubmission,
        today: NaiveDate,
    ) -> Result<EntitlementConfig, LeaveError> {
        let leave_type = submission.leave_type;
        let (start, end) = (submission.start_date, submission.end_date);

        if !employee.is_confirmed && leave_type != LeaveType::Sick {
            return Err(LeaveError::ProbationRestriction { leave_type });
        }
        if start > end {
            return Err(LeaveError::InvalidDateRange { start, end });
        }
        let yesterday = today.pred_opt().unwrap_or(today);
        if start < yesterday && leave_type != LeaveType::Emergency {
            return Err(LeaveError::PastDateNotAllowed { start });
        }

        let policy = self.policy(leave_type);
        if !policy.is_active {
            return Err(LeaveError::LeaveTypeInactive(leave_type));
        }
        if policy.requires_attachment && submission.attachment.is_none() {
            return Err(LeaveError::AttachmentRequired(leave_type));
        }
        let has_sub_type = submission
            .sub_type
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if policy.requires_sub_type && !has_sub_type {
            return Err(LeaveError::SubTypeRequired(leave_type));
        }
        if submission.day_portion.is_half() && start != end {
            return Err(LeaveError::HalfDayRequiresSingleDay);
        }
        if leave_type != LeaveType::Emergency && policy.min_advance_days > 0 {
            let earliest = today
                .checked_add_days(Days::new(u64::from(policy.min_advance_days)))
                .unwrap_or(today);
            if start < earliest {
                return Err(LeaveError::InsufficientNotice {
                    required_days: policy.min_advance_days,
                });
            }
        }

        Ok(policy)
    }

    /// Validates a submission and prices it.
    ///
    /// # Errors
    ///
    /// Any `validate` error, or `ExceedsMaxDuration` if the chargeable
    /// duration is above the per-application cap.
    pub fn assess(
        &self,
        employee: &EmployeeProfile,
        submission: &LeaveSubmission,
        today: NaiveDate,
    ) -> Result<Assessment, LeaveError> {
        let policy = self.validate(employee, submission, today)?;
        let days = self.count_days(
            policy.day_count,
            submission.start_date,
            submission.end_date,
            employee.region.as_deref(),
        );
        let duration = days * submission.day_portion.factor();

        if let Some(max) = policy.max_days_per_application
            && duration > max
        {
            return Err(LeaveError::ExceedsMaxDuration {
                max,
                requested: duration,
            });
        }

        Ok(Assessment { policy, duration })
    }
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    use rstest::rstest;
    use rust_decimal_macros::dec;

    use crate::calendar::{HolidayRegistry, PublicHoliday};
    use crate::entitlement::types::EntitlementConfigUpdate;
    use crate::lifecycle::{AttachmentRef, DayPortion};

    /// Map-backed policy store for calculator tests.
    #[derive(Default)]
    struct MapStore(RwLock<HashMap<LeaveType, EntitlementConfig>>);

    impl MapStore {
        fn with(configs: impl IntoIterator<Item = EntitlementConfig>) -> Self {
            Self(RwLock::new(
                configs.into_iter().map(|c| (c.leave_type, c)).collect(),
            ))
        }
    }

    impl EntitlementConfigStore for MapStore {
        fn get(&self, leave_type: LeaveType) -> Result<EntitlementConfig, LeaveError> {
            self.0
                .read()
                .unwrap()
                .get(&leave_type)
                .cloned()
                .ok_or(LeaveError::ConfigurationMissing(leave_type))
        }

        fn list(&self) -> Vec<EntitlementConfig> {
            self.0.read().unwrap().values().cloned().collect()
        }

        fn update(
            &self,
            leave_type: LeaveType,
            update: &EntitlementConfigUpdate,
        ) -> Result<EntitlementConfig, LeaveError> {
            let mut map = self.0.write().unwrap();
            let config = map
                .get_mut(&leave_type)
                .ok_or(LeaveError::ConfigurationMissing(leave_type))?;
            update.apply_to(config);
            Ok(config.clone())
        }

        fn seed_defaults_if_empty(&self) -> usize {
            0
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calculator(holidays: Vec<PublicHoliday>) -> EntitlementCalculator {
        EntitlementCalculator::new(
            Arc::new(HolidayRegistry::with_holidays(holidays)),
            Arc::new(MapStore::with(crate::entitlement::seed_configs())),
        )
    }

    fn today() -> NaiveDate {
        date(2025, 3, 3)
    }

    fn confirmed() -> EmployeeProfile {
        EmployeeProfile::new("Siti Hajar", date(2019, 2, 11))
    }

    #[rstest]
    #[case(date(2020, 1, 1), 2025, 5)]
    #[case(date(2020, 1, 2), 2025, 4)]
    #[case(date(2020, 12, 31), 2025, 4)]
    #[case(date(2025, 6, 1), 2025, 0)]
    #[case(date(2024, 6, 1), 2025, 0)]
    #[case(date(2026, 6, 1), 2025, 0)]
    fn test_tenure_years(#[case] joined: NaiveDate, #[case] year: i32, #[case] expected: u32) {
        assert_eq!(EntitlementCalculator::tenure_years(joined, year), expected);
    }

    #[rstest]
    #[case(date(2025, 7, 1), date(2025, 12, 31), 6)]
    #[case(date(2025, 7, 15), date(2025, 12, 31), 5)]
    #[case(date(2025, 1, 1), date(2025, 12, 31), 12)]
    #[case(date(2025, 12, 1), date(2025, 12, 31), 1)]
    #[case(date(2025, 12, 2), date(2025, 12, 31), 0)]
    #[case(date(2026, 1, 1), date(2025, 12, 31), 0)]
    fn test_completed_months(#[case] joined: NaiveDate, #[case] as_of: NaiveDate, #[case] expected: u32) {
        assert_eq!(EntitlementCalculator::completed_months(joined, as_of), expected);
    }

    #[test]
    fn test_mid_year_joiner_gets_half_quota() {
        let calc = calculator(vec![]);
        assert_eq!(
            calc.annual_quota(LeaveType::Annual, date(2025, 7, 1), 2025),
            dec!(6)
        );
    }

    #[test]
    fn test_proration_rounds_to_two_places() {
        let calc = calculator(vec![]);
        // 12 * 5 / 12 = 5, 14 (sick is not prorated) stays 14.
        assert_eq!(
            calc.annual_quota(LeaveType::Annual, date(2025, 7, 20), 2025),
            dec!(5)
        );
        assert_eq!(
            calc.annual_quota(LeaveType::Sick, date(2025, 7, 20), 2025),
            dec!(14)
        );

        let mut policy = EntitlementConfig::new(LeaveType::Annual, dec!(14));
        policy.prorate_first_year = true;
        assert_eq!(
            EntitlementCalculator::quota_for(&policy, date(2025, 3, 1), 2025),
            dec!(11.67)
        );
    }

    #[test]
    fn test_tier_bonus_after_tenure() {
        let calc = calculator(vec![]);
        let joined = date(2019, 2, 11);
        assert_eq!(calc.annual_quota(LeaveType::Annual, joined, 2021), dec!(12));
        assert_eq!(calc.annual_quota(LeaveType::Annual, joined, 2022), dec!(16));
        assert_eq!(calc.annual_quota(LeaveType::Annual, joined, 2025), dec!(24));
    }

    #[test]
    fn test_missing_row_uses_fallback_table() {
        let calc = EntitlementCalculator::new(
            Arc::new(HolidayRegistry::new()),
            Arc::new(MapStore::default()),
        );
        assert_eq!(calc.annual_quota(LeaveType::Sick, date(2018, 1, 1), 2025), dec!(22));
        assert_eq!(
            calc.annual_quota(LeaveType::Annual, date(2018, 1, 1), 2025),
            dec!(16)
        );
    }

    #[test]
    fn test_calendar_day_types_count_every_day() {
        let calc = calculator(vec![]);
        // Friday 2025-05-02 through Thursday 2025-05-08 spans a weekend.
        let days = calc
            .chargeable_duration(date(2025, 5, 2), date(2025, 5, 8), LeaveType::Maternity, None)
            .unwrap();
        assert_eq!(days, dec!(7));
        let days = calc
            .chargeable_duration(date(2025, 5, 2), date(2025, 5, 8), LeaveType::Paternity, None)
            .unwrap();
        assert_eq!(days, dec!(7));
    }

    #[test]
    fn test_working_days_exclude_weekend_and_holiday() {
        let calc = calculator(vec![PublicHoliday::nationwide("Wesak Day", date(2025, 5, 5))]);
        let days = calc
            .chargeable_duration(date(2025, 5, 2), date(2025, 5, 8), LeaveType::Annual, None)
            .unwrap();
        assert_eq!(days, dec!(4));
    }

    #[test]
    fn test_regional_holiday_only_for_region() {
        let calc = calculator(vec![PublicHoliday::regional(
            "Thaipusam",
            date(2025, 2, 11),
            "selangor",
        )]);
        let span = (date(2025, 2, 10), date(2025, 2, 12));
        assert_eq!(
            calc.chargeable_duration(span.0, span.1, LeaveType::Annual, Some("selangor"))
                .unwrap(),
            dec!(2)
        );
        assert_eq!(
            calc.chargeable_duration(span.0, span.1, LeaveType::Annual, Some("penang"))
                .unwrap(),
            dec!(3)
        );
    }

    #[test]
    fn test_reversed_range_is_invalid() {
        let calc = calculator(vec![]);
        let result =
            calc.chargeable_duration(date(2025, 5, 8), date(2025, 5, 2), LeaveType::Annual, None);
        assert!(matches!(result, Err(LeaveError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_probation_allows_only_sick_leave() {
        let calc = calculator(vec![]);
        let employee = EmployeeProfile::new("New Joiner", date(2025, 2, 3)).on_probation();
        let annual = LeaveSubmission::new(employee.id, LeaveType::Annual, today(), today());
        assert_eq!(
            calc.validate(&employee, &annual, today()),
            Err(LeaveError::ProbationRestriction {
                leave_type: LeaveType::Annual
            })
        );

        let sick = LeaveSubmission::new(employee.id, LeaveType::Sick, today(), today())
            .with_attachment(AttachmentRef {
                storage_key: "mc/123.pdf".to_string(),
                file_name: "mc.pdf".to_string(),
            });
        assert!(calc.validate(&employee, &sick, today()).is_ok());
    }

    #[test]
    fn test_past_dates_rejected_except_emergency() {
        let calc = calculator(vec![]);
        let employee = confirmed();
        let two_days_ago = date(2025, 3, 1);
        let yesterday = date(2025, 3, 2);

        let annual = LeaveSubmission::new(employee.id, LeaveType::Annual, two_days_ago, two_days_ago);
        assert_eq!(
            calc.validate(&employee, &annual, today()),
            Err(LeaveError::PastDateNotAllowed {
                start: two_days_ago
            })
        );

        let from_yesterday = LeaveSubmission::new(employee.id, LeaveType::Annual, yesterday, today());
        assert!(calc.validate(&employee, &from_yesterday, today()).is_ok());

        let emergency =
            LeaveSubmission::new(employee.id, LeaveType::Emergency, two_days_ago, two_days_ago);
        assert!(calc.validate(&employee, &emergency, today()).is_ok());
    }

    #[test]
    fn test_policy_supplement_checks() {
        let calc = calculator(vec![]);
        let employee = confirmed();
        let day = date(2025, 3, 10);

        let sick = LeaveSubmission::new(employee.id, LeaveType::Sick, day, day);
        assert_eq!(
            calc.validate(&employee, &sick, today()),
            Err(LeaveError::AttachmentRequired(LeaveType::Sick))
        );

        let special = LeaveSubmission::new(employee.id, LeaveType::Special, day, day);
        assert_eq!(
            calc.validate(&employee, &special, today()),
            Err(LeaveError::SubTypeRequired(LeaveType::Special))
        );
        assert!(
            calc.validate(&employee, &special.with_sub_type("marriage"), today())
                .is_ok()
        );

        let half = LeaveSubmission::new(employee.id, LeaveType::Annual, day, date(2025, 3, 11))
            .with_portion(DayPortion::FirstHalf);
        assert_eq!(
            calc.validate(&employee, &half, today()),
            Err(LeaveError::HalfDayRequiresSingleDay)
        );
    }

    #[test]
    fn test_inactive_type_and_notice() {
        let mut annual = crate::entitlement::seed_configs()
            .into_iter()
            .find(|c| c.leave_type == LeaveType::Annual)
            .unwrap();
        annual.min_advance_days = 3;
        let mut unpaid = EntitlementConfig::new(LeaveType::Unpaid, dec!(0));
        unpaid.is_active = false;

        let calc = EntitlementCalculator::new(
            Arc::new(HolidayRegistry::new()),
            Arc::new(MapStore::with([annual, unpaid])),
        );
        let employee = confirmed();

        let soon = LeaveSubmission::new(employee.id, LeaveType::Annual, date(2025, 3, 5), date(2025, 3, 5));
        assert_eq!(
            calc.validate(&employee, &soon, today()),
            Err(LeaveError::InsufficientNotice { required_days: 3 })
        );
        let later = LeaveSubmission::new(employee.id, LeaveType::Annual, date(2025, 3, 6), date(2025, 3, 6));
        assert!(calc.validate(&employee, &later, today()).is_ok());

        let unpaid = LeaveSubmission::new(employee.id, LeaveType::Unpaid, date(2025, 3, 6), date(2025, 3, 6));
        assert_eq!(
            calc.validate(&employee, &unpaid, today()),
            Err(LeaveError::LeaveTypeInactive(LeaveType::Unpaid))
        );
    }

    #[test]
    fn test_assess_half_day_and_max_duration() {
        let mut annual = crate::entitlement::fallback_config(LeaveType::Annual);
        annual.max_days_per_application = Some(dec!(3));
        let calc = EntitlementCalculator::new(
            Arc::new(HolidayRegistry::new()),
            Arc::new(MapStore::with([annual])),
        );
        let employee = confirmed();

        let half = LeaveSubmission::new(employee.id, LeaveType::Annual, date(2025, 3, 10), date(2025, 3, 10))
            .with_portion(DayPortion::SecondHalf);
        assert_eq!(calc.assess(&employee, &half, today()).unwrap().duration, dec!(0.5));

        let week = LeaveSubmission::new(employee.id, LeaveType::Annual, date(2025, 3, 10), date(2025, 3, 14));
        assert_eq!(
            calc.assess(&employee, &week, today()),
            Err(LeaveError::ExceedsMaxDuration {
                max: dec!(3),
                requested: dec!(5),
            })
        );
    }

    #[test]
    fn test_half_day_on_weekend_charges_nothing() {
        let calc = calculator(vec![]);
        let employee = confirmed();
        let saturday = date(2025, 3, 8);
        let half = LeaveSubmission::new(employee.id, LeaveType::Annual, saturday, saturday)
            .with_portion(DayPortion::FirstHalf);
        assert_eq!(calc.assess(&employee, &half, today()).unwrap().duration, dec!(0));
    }
}
