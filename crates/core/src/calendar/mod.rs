//! Public holiday calendar.
//!
//! The working-day calculator only needs one question answered: is a given
//! date a non-working public holiday for the employee's region? Holidays with
//! no region are nationwide.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use leavewise_shared::HolidayId;

/// Answers whether a date is a public holiday.
pub trait HolidayCalendar: Send + Sync {
    /// Returns true if `date` is an active public holiday in `region`.
    ///
    /// Nationwide holidays match every region, including `None`.
    fn is_holiday(&self, date: NaiveDate, region: Option<&str>) -> bool;
}

/// A public holiday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicHoliday {
    /// Unique identifier.
    pub id: HolidayId,
    /// Holiday name.
    pub name: String,
    /// Date the holiday falls on.
    pub date: NaiveDate,
    /// Region the holiday applies to (`None` for nationwide).
    pub region: Option<String>,
    /// Inactive holidays are kept for history but ignored by lookups.
    pub is_active: bool,
}

impl PublicHoliday {
    /// Creates an active nationwide holiday.
    #[must_use]
    pub fn nationwide(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: HolidayId::new(),
            name: name.into(),
            date,
            region: None,
            is_active: true,
        }
    }

    /// Creates an active regional holiday.
    #[must_use]
    pub fn regional(name: impl Into<String>, date: NaiveDate, region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            ..Self::nationwide(name, date)
        }
    }

    /// Returns true if this holiday applies to an employee in `region`.
    #[must_use]
    pub fn applies_to(&self, region: Option<&str>) -> bool {
        self.is_active
            && match (&self.region, region) {
                (None, _) => true,
                (Some(own), Some(wanted)) => own.eq_ignore_ascii_case(wanted),
                (Some(_), None) => false,
            }
    }
}

/// In-memory holiday calendar indexed by date.
///
/// Holidays can be added or retired while calculators hold the registry.
#[derive(Debug, Default)]
pub struct HolidayRegistry {
    by_date: RwLock<HashMap<NaiveDate, Vec<PublicHoliday>>>,
}

impl HolidayRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from a list of holidays.
    #[must_use]
    pub fn with_holidays(holidays: impl IntoIterator<Item = PublicHoliday>) -> Self {
        let registry = Self::new();
        for holiday in holidays {
            registry.add(holiday);
        }
        registry
    }

    /// Adds a holiday.
    pub fn add(&self, holiday: PublicHoliday) {
        self.by_date
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(holiday.date)
            .or_default()
            .push(holiday);
    }

    /// Marks a holiday inactive. Returns false if the id is unknown.
    pub fn deactivate(&self, id: HolidayId) -> bool {
        let mut by_date = self.by_date.write().unwrap_or_else(PoisonError::into_inner);
        match by_date.values_mut().flatten().find(|h| h.id == id) {
            Some(holiday) => {
                holiday.is_active = false;
                true
            }
            None => false,
        }
    }

    /// Lists the active holidays of a calendar year, ordered by date.
    #[must_use]
    pub fn holidays_in_year(&self, year: i32) -> Vec<PublicHoliday> {
        let mut holidays: Vec<_> = self
            .by_date
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(date, _)| date.year() == year)
            .flat_map(|(_, list)| list.iter().filter(|h| h.is_active).cloned())
            .collect();
        holidays.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
        holidays
    }

    /// Every holiday, active or not, ordered by date.
    #[must_use]
    pub fn all(&self) -> Vec<PublicHoliday> {
        let mut holidays: Vec<_> = self
            .by_date
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .flatten()
            .cloned()
            .collect();
        holidays.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
        holidays
    }
}

impl HolidayCalendar for HolidayRegistry {
    fn is_holiday(&self, date: NaiveDate, region: Option<&str>) -> bool {
        self.by_date
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&date)
            .is_some_and(|list| list.iter().any(|h| h.applies_to(region)))
    }
}
