//! JSON files the worker starts from and checkpoints to.
//!
//! The seed file carries reference data owned elsewhere (employees, public
//! holidays, policy overrides). The snapshot carries what the engine itself
//! writes: requests, chronology and ledger rows. Snapshots are written to a
//! sibling temp file first and renamed into place, so a crash mid-write
//! leaves the previous snapshot intact.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use leavewise_core::calendar::{HolidayRegistry, PublicHoliday};
use leavewise_core::collaborators::{EmployeeProfile, EntitlementConfigStore};
use leavewise_core::entitlement::EntitlementConfig;
use leavewise_core::ledger::LeaveBalance;
use leavewise_core::lifecycle::{ChronologyEntry, LeaveRequest};

use crate::repositories::{
    CachedEntitlementConfigStore, InMemoryEmployeeDirectory, InMemoryEntitlementConfigStore,
};

/// Failure reading or writing a data file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The file is not valid JSON of the expected shape.
    #[error("Malformed data in {path}: {source}")]
    Malformed {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn malformed(path: &Path, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Everything `LeaveStore` holds, as plain lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Live requests.
    #[serde(default)]
    pub requests: Vec<LeaveRequest>,
    /// Chronology of live requests, grouped by request in recorded order.
    #[serde(default)]
    pub chronology: Vec<ChronologyEntry>,
    /// Ledger rows.
    #[serde(default)]
    pub balances: Vec<LeaveBalance>,
    /// Requests moved out by retention.
    #[serde(default)]
    pub archived_requests: Vec<LeaveRequest>,
    /// Chronology of archived requests.
    #[serde(default)]
    pub archived_chronology: Vec<ChronologyEntry>,
}

impl StoreSnapshot {
    /// Reads a snapshot. `Ok(None)` if the file does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>, StorageError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::io(path, err)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StorageError::malformed(path, err))
    }

    /// Writes the snapshot, replacing any previous one in a single rename.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| StorageError::io(dir, err))?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|err| StorageError::malformed(path, err))?;

        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        fs::write(&staging, json).map_err(|err| StorageError::io(&staging, err))?;
        fs::rename(&staging, path).map_err(|err| StorageError::io(path, err))?;

        tracing::debug!(
            path = %path.display(),
            requests = self.requests.len(),
            balances = self.balances.len(),
            "Snapshot written"
        );
        Ok(())
    }
}

/// Reference data loaded at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    /// Employee directory.
    #[serde(default)]
    pub employees: Vec<EmployeeProfile>,
    /// Public holidays, active or not.
    #[serde(default)]
    pub holidays: Vec<PublicHoliday>,
    /// Policy rows replacing the built-in defaults for their leave type.
    #[serde(default)]
    pub entitlements: Vec<EntitlementConfig>,
}

/// Counts of what a seed file contributed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Employees upserted.
    pub employees: usize,
    /// Holidays added.
    pub holidays: usize,
    /// Policy rows replaced.
    pub entitlements: usize,
}

impl SeedData {
    /// Reads a seed file.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let raw = fs::read_to_string(path).map_err(|err| StorageError::io(path, err))?;
        serde_json::from_str(&raw).map_err(|err| StorageError::malformed(path, err))
    }

    /// Loads the seed into the running collaborators.
    ///
    /// Built-in policy defaults are written first, so a seed only needs the
    /// leave types it changes.
    pub fn apply(
        self,
        directory: &InMemoryEmployeeDirectory,
        holidays: &HolidayRegistry,
        configs: &CachedEntitlementConfigStore<InMemoryEntitlementConfigStore>,
    ) -> SeedSummary {
        let summary = SeedSummary {
            employees: self.employees.len(),
            holidays: self.holidays.len(),
            entitlements: self.entitlements.len(),
        };

        configs.seed_defaults_if_empty();
        for config in self.entitlements {
            configs.inner().put(config);
        }
        configs.invalidate_all();

        for employee in self.employees {
            directory.upsert(employee);
        }
        for holiday in self.holidays {
            holidays.add(holiday);
        }

        tracing::info!(
            employees = summary.employees,
            holidays = summary.holidays,
            entitlements = summary.entitlements,
            "Seed data loaded"
        );
        summary
    }
}
