//! Leave entitlement policy and calculation.
//!
//! - `types` - leave types and per-type policy rows
//! - `defaults` - seed and fallback policy tables
//! - `calculator` - annual quota, chargeable duration and request validation

pub mod calculator;
pub mod defaults;
pub mod types;

#[cfg(test)]
mod calculator_props;

pub use calculator::{Assessment, EntitlementCalculator};
pub use defaults::{default_day_count, fallback_config, is_balance_bearing_by_default, seed_configs};
pub use types::{DayCountRule, EntitlementConfig, EntitlementConfigUpdate, LeaveType};
