//! In-process employee directory.

use dashmap::DashMap;

use leavewise_core::LeaveError;
use leavewise_core::collaborators::{EmployeeProfile, IdentityProvider};
use leavewise_shared::EmployeeId;

/// Employee directory backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryEmployeeDirectory {
    employees: DashMap<EmployeeId, EmployeeProfile>,
    default_region: Option<String>,
}

impl InMemoryEmployeeDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty directory that assigns `region` to employees
    /// stored without one.
    #[must_use]
    pub fn with_default_region(region: Option<String>) -> Self {
        Self {
            employees: DashMap::new(),
            default_region: region,
        }
    }

    /// Inserts or replaces a profile.
    pub fn upsert(&self, mut profile: EmployeeProfile) {
        if profile.region.is_none() {
            profile.region.clone_from(&self.default_region);
        }
        self.employees.insert(profile.id, profile);
    }

    /// Removes a profile. Returns it if it existed.
    pub fn remove(&self, id: EmployeeId) -> Option<EmployeeProfile> {
        self.employees.remove(&id).map(|(_, profile)| profile)
    }

    /// Every employee id, in no particular order.
    #[must_use]
    pub fn all_ids(&self) -> Vec<EmployeeId> {
        self.employees.iter().map(|e| *e.key()).collect()
    }

    /// Number of employees.
    #[must_use]
    pub fn len(&self) -> usize {
        self.employees.len()
    }

    /// Returns true if the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }
}

impl IdentityProvider for InMemoryEmployeeDirectory {
    fn employee(&self, id: EmployeeId) -> Result<EmployeeProfile, LeaveError> {
        self.employees
            .get(&id)
            .map(|e| e.clone())
            .ok_or_else(|| LeaveError::employee_not_found(id))
    }

    fn direct_reports(&self, manager: EmployeeId) -> Vec<EmployeeId> {
        let mut reports: Vec<EmployeeId> = self
            .employees
            .iter()
            .filter(|e| e.manager_id == Some(manager))
            .map(|e| e.id)
            .collect();
        reports.sort();
        reports
    }
}
