//! Time-driven background jobs for Leavewise.
//!
//! - `escalation` - daily escalation and reminder sweeps
//! - `year_end` - annual carry-forward and archival
//! - `scheduler` - timezone-aware timers driving both

pub mod error;
pub mod escalation;
pub mod scheduler;
pub mod year_end;

pub use error::JobError;
pub use escalation::{EscalationReport, EscalationScheduler, ReminderReport};
pub use scheduler::{JobScheduler, next_daily_run, next_yearly_run};
pub use year_end::{YearEndProcessor, YearEndReport};
