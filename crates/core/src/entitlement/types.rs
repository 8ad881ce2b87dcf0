//! Leave types and per-type entitlement policy.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Category of leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    /// Paid annual leave.
    Annual,
    /// Medical leave.
    Sick,
    /// Maternity leave (calendar days).
    Maternity,
    /// Paternity leave (calendar days).
    Paternity,
    /// Short-notice emergency leave; may be backdated.
    Emergency,
    /// Unpaid leave.
    Unpaid,
    /// Catch-all category tagged with a sub-type (marriage, compassionate, ...).
    Special,
    /// Extended hospitalization leave.
    Hospitalization,
}

impl LeaveType {
    /// Every leave type, in display order.
    pub const ALL: [Self; 8] = [
        Self::Annual,
        Self::Sick,
        Self::Maternity,
        Self::Paternity,
        Self::Emergency,
        Self::Unpaid,
        Self::Special,
        Self::Hospitalization,
    ];

    /// Returns the string representation of the leave type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Sick => "sick",
            Self::Maternity => "maternity",
            Self::Paternity => "paternity",
            Self::Emergency => "emergency",
            Self::Unpaid => "unpaid",
            Self::Special => "special",
            Self::Hospitalization => "hospitalization",
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the days of a request are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCountRule {
    /// Weekdays that are not public holidays.
    WorkingDays,
    /// Every calendar day, weekends and holidays included.
    CalendarDays,
}

/// Policy row for one leave type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementConfig {
    /// The leave type this row governs.
    pub leave_type: LeaveType,
    /// Days granted before tenure bonuses.
    pub base_entitlement: Decimal,
    /// Tenure threshold (completed years) to bonus days.
    pub tenure_tiers: BTreeMap<u32, Decimal>,
    /// Prorate the quota by months served when tenure is zero.
    pub prorate_first_year: bool,
    /// Usage is checked against and debited from the ledger.
    pub balance_bearing: bool,
    /// Day counting rule for chargeable duration.
    pub day_count: DayCountRule,
    /// Unused days may roll into the next year.
    pub allow_carry_forward: bool,
    /// Cap on carried days.
    pub max_carry_forward_days: Decimal,
    /// Cap on the chargeable duration of a single request.
    pub max_days_per_application: Option<Decimal>,
    /// A supporting document must accompany the request.
    pub requires_attachment: bool,
    /// A sub-type tag must accompany the request.
    pub requires_sub_type: bool,
    /// Minimum days between today and the start date.
    pub min_advance_days: u32,
    /// Inactive types cannot be requested.
    pub is_active: bool,
    /// Ordering hint for listings.
    pub display_order: u32,
}

impl EntitlementConfig {
    /// Creates a permissive, non-balance-bearing policy with no entitlement.
    #[must_use]
    pub fn new(leave_type: LeaveType, base_entitlement: Decimal) -> Self {
        Self {
            leave_type,
            base_entitlement,
            tenure_tiers: BTreeMap::new(),
            prorate_first_year: false,
            balance_bearing: false,
            day_count: DayCountRule::WorkingDays,
            allow_carry_forward: false,
            max_carry_forward_days: Decimal::ZERO,
            max_days_per_application: None,
            requires_attachment: false,
            requires_sub_type: false,
            min_advance_days: 0,
            is_active: true,
            display_order: 0,
        }
    }

    /// Sum of every tier bonus whose threshold has been reached.
    #[must_use]
    pub fn tier_bonus(&self, tenure_years: u32) -> Decimal {
        self.tenure_tiers
            .range(..=tenure_years)
            .map(|(_, bonus)| *bonus)
            .sum()
    }

    /// Carry-forward cap, if this type carries anything forward at all.
    #[must_use]
    pub fn carry_forward_cap(&self) -> Option<Decimal> {
        (self.balance_bearing && self.allow_carry_forward).then_some(self.max_carry_forward_days)
    }
}

/// Partial update of a policy row; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementConfigUpdate {
    /// New base entitlement.
    pub base_entitlement: Option<Decimal>,
    /// Replacement tenure tiers.
    pub tenure_tiers: Option<BTreeMap<u32, Decimal>>,
    /// New proration flag.
    pub prorate_first_year: Option<bool>,
    /// New balance-bearing flag.
    pub balance_bearing: Option<bool>,
    /// New day counting rule.
    pub day_count: Option<DayCountRule>,
    /// New carry-forward flag.
    pub allow_carry_forward: Option<bool>,
    /// New carry-forward cap.
    pub max_carry_forward_days: Option<Decimal>,
    /// New per-application cap (`Some(None)` removes it).
    pub max_days_per_application: Option<Option<Decimal>>,
    /// New attachment flag.
    pub requires_attachment: Option<bool>,
    /// New sub-type flag.
    pub requires_sub_type: Option<bool>,
    /// New advance notice.
    pub min_advance_days: Option<u32>,
    /// New active flag.
    pub is_active: Option<bool>,
    /// New display order.
    pub display_order: Option<u32>,
}

impl EntitlementConfigUpdate {
    /// Applies the present fields to `config`.
    pub fn apply_to(&self, config: &mut EntitlementConfig) {
        if let Some(v) = self.base_entitlement {
            config.base_entitlement = v;
        }
        if let Some(v) = &self.tenure_tiers {
            config.tenure_tiers.clone_from(v);
        }
        if let Some(v) = self.prorate_first_year {
            config.prorate_first_year = v;
        }
        if let Some(v) = self.balance_bearing {
            config.balance_bearing = v;
        }
        if let Some(v) = self.day_count {
            config.day_count = v;
        }
        if let Some(v) = self.allow_carry_forward {
            config.allow_carry_forward = v;
        }
        if let Some(v) = self.max_carry_forward_days {
            config.max_carry_forward_days = v;
        }
        if let Some(v) = self.max_days_per_application {
            config.max_days_per_application = v;
        }
        if let Some(v) = self.requires_attachment {
            config.requires_attachment = v;
        }
        if let Some(v) = self.requires_sub_type {
            config.requires_sub_type = v;
        }
        if let Some(v) = self.min_advance_days {
            config.min_advance_days = v;
        }
        if let Some(v) = self.is_active {
            config.is_active = v;
        }
        if let Some(v) = self.display_order {
            config.display_order = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_leave_type_serde_matches_as_str() {
        for leave_type in LeaveType::ALL {
            let json = serde_json::to_value(leave_type).unwrap();
            assert_eq!(json, leave_type.as_str());
        }
    }

    #[test]
    fn test_tier_bonus_sums_reached_thresholds() {
        let mut config = EntitlementConfig::new(LeaveType::Annual, dec!(12));
        config.tenure_tiers = BTreeMap::from([(2, dec!(4)), (5, dec!(8))]);

        assert_eq!(config.tier_bonus(0), dec!(0));
        assert_eq!(config.tier_bonus(2), dec!(4));
        assert_eq!(config.tier_bonus(4), dec!(4));
        assert_eq!(config.tier_bonus(5), dec!(12));
    }

    #[test]
    fn test_carry_forward_cap_requires_balance_bearing() {
        let mut config = EntitlementConfig::new(LeaveType::Annual, dec!(12));
        config.allow_carry_forward = true;
        config.max_carry_forward_days = dec!(5);
        assert_eq!(config.carry_forward_cap(), None);

        config.balance_bearing = true;
        assert_eq!(config.carry_forward_cap(), Some(dec!(5)));
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut config = EntitlementConfig::new(LeaveType::Sick, dec!(14));
        let update = EntitlementConfigUpdate {
            base_entitlement: Some(dec!(16)),
            max_days_per_application: Some(Some(dec!(3))),
            ..Default::default()
        };
        update.apply_to(&mut config);

        assert_eq!(config.base_entitlement, dec!(16));
        assert_eq!(config.max_days_per_application, Some(dec!(3)));
        assert!(config.is_active);
        assert_eq!(config.day_count, DayCountRule::WorkingDays);
    }
}
