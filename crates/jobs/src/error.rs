//! Job error types.

use thiserror::Error;

/// Errors that stop a job from running at all.
///
/// Per-item failures inside a batch are counted in the job's report instead.
#[derive(Debug, Error)]
pub enum JobError {
    /// The configured timezone is not a known IANA name.
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    /// The configured year-end date never occurs.
    #[error("Invalid year-end date: month {month}, day {day}")]
    InvalidYearEndDate {
        /// Configured month.
        month: u32,
        /// Configured day.
        day: u32,
    },

    /// The blocking batch thread panicked or was cancelled.
    #[error("Job worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
