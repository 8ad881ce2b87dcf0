//! Entitlement policy store contract.

use crate::entitlement::{EntitlementConfig, EntitlementConfigUpdate, LeaveType};
use crate::error::LeaveError;

/// CRUD access to per-type entitlement policy.
///
/// Read-mostly: the calculator reads on every submission, administrators
/// write rarely.
pub trait EntitlementConfigStore: Send + Sync {
    /// Returns the policy row for `leave_type`.
    ///
    /// Fails with `ConfigurationMissing` if no row exists.
    fn get(&self, leave_type: LeaveType) -> Result<EntitlementConfig, LeaveError>;

    /// Lists every row ordered by `display_order`.
    fn list(&self) -> Vec<EntitlementConfig>;

    /// Applies a partial update and returns the new row.
    fn update(
        &self,
        leave_type: LeaveType,
        update: &EntitlementConfigUpdate,
    ) -> Result<EntitlementConfig, LeaveError>;

    /// Writes the seed table if the store is empty. Returns the rows written.
    fn seed_defaults_if_empty(&self) -> usize;
}
