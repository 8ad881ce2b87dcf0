//! Timezone-aware timers for the background jobs.
//!
//! Fire instants are computed in the configured timezone and converted to
//! UTC. A local time that does not exist on a given day (a DST gap) skips
//! that day.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;

use leavewise_shared::{Clock, ScheduleConfig};

use crate::error::JobError;
use crate::escalation::{EscalationReport, EscalationScheduler, ReminderReport};
use crate::year_end::{YearEndProcessor, YearEndReport};

/// Next instant strictly after `now` at which the local clock in `tz` reads `at`.
#[must_use]
pub fn next_daily_run(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();
    (0..=2)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter_map(|day| tz.from_local_datetime(&day.and_time(at)).earliest())
        .map(|local| local.with_timezone(&Utc))
        .find(|fire| *fire > now)
        .unwrap_or(now + Duration::days(1))
}

/// Next instant strictly after `now` falling on `month`/`day` at `at` in `tz`.
///
/// `None` if that date does not occur in the next eight years.
#[must_use]
pub fn next_yearly_run(
    now: DateTime<Utc>,
    month: u32,
    day: u32,
    at: NaiveTime,
    tz: Tz,
) -> Option<DateTime<Utc>> {
    let year = now.with_timezone(&tz).year();
    (year..=year + 8)
        .filter_map(|y| NaiveDate::from_ymd_opt(y, month, day))
        .filter_map(|date| tz.from_local_datetime(&date.and_time(at)).earliest())
        .map(|local| local.with_timezone(&Utc))
        .find(|fire| *fire > now)
}

#[derive(Debug, Clone, Copy)]
enum Job {
    Escalation,
    Reminders,
    YearEnd,
}

impl Job {
    fn name(self) -> &'static str {
        match self {
            Self::Escalation => "escalation",
            Self::Reminders => "reminders",
            Self::YearEnd => "year_end",
        }
    }
}

/// Drives the escalation, reminder and year-end jobs.
pub struct JobScheduler {
    escalation: EscalationScheduler,
    year_end: YearEndProcessor,
    schedule: ScheduleConfig,
    tz: Tz,
    clock: Arc<dyn Clock>,
}

impl JobScheduler {
    /// Creates a scheduler.
    ///
    /// # Errors
    ///
    /// * `InvalidTimezone` if the timezone is not a known IANA name
    /// * `InvalidYearEndDate` if the year-end month/day never occurs
    pub fn new(
        escalation: EscalationScheduler,
        year_end: YearEndProcessor,
        schedule: ScheduleConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, JobError> {
        let tz: Tz = schedule
            .timezone
            .parse()
            .map_err(|_| JobError::InvalidTimezone(schedule.timezone.clone()))?;
        // 2024 is a leap year, so Feb 29 passes.
        if NaiveDate::from_ymd_opt(2024, schedule.year_end_month, schedule.year_end_day).is_none() {
            return Err(JobError::InvalidYearEndDate {
                month: schedule.year_end_month,
                day: schedule.year_end_day,
            });
        }

        Ok(Self {
            escalation,
            year_end,
            schedule,
            tz,
            clock,
        })
    }

    /// Runs all three timers until `shutdown` flips to true or its sender
    /// is dropped.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        tracing::info!(timezone = %self.tz, "Job scheduler started");
        tokio::join!(
            self.job_loop(Job::Escalation, shutdown.clone()),
            self.job_loop(Job::Reminders, shutdown.clone()),
            self.job_loop(Job::YearEnd, shutdown),
        );
        tracing::info!("Job scheduler stopped");
    }

    /// Runs the escalation sweep immediately.
    ///
    /// # Errors
    ///
    /// Returns `JobError::Worker` if the sweep thread panicked.
    pub async fn run_escalation_now(&self) -> Result<EscalationReport, JobError> {
        let escalation = self.escalation.clone();
        Ok(tokio::task::spawn_blocking(move || escalation.check_escalated_requests()).await?)
    }

    /// Runs the reminder sweep immediately.
    ///
    /// # Errors
    ///
    /// Returns `JobError::Worker` if the sweep thread panicked.
    pub async fn run_reminders_now(&self) -> Result<ReminderReport, JobError> {
        let escalation = self.escalation.clone();
        Ok(tokio::task::spawn_blocking(move || escalation.send_reminder_emails()).await?)
    }

    /// Runs year-end processing for `year` immediately.
    ///
    /// # Errors
    ///
    /// Returns `JobError::Worker` if the carry-forward thread panicked.
    pub async fn run_year_end_now(&self, year: i32) -> Result<YearEndReport, JobError> {
        self.year_end.run(year).await
    }

    fn next_fire(&self, job: Job, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match job {
            Job::Escalation => Some(next_daily_run(now, self.schedule.escalation_at, self.tz)),
            Job::Reminders => Some(next_daily_run(now, self.schedule.reminder_at, self.tz)),
            Job::YearEnd => next_yearly_run(
                now,
                self.schedule.year_end_month,
                self.schedule.year_end_day,
                self.schedule.year_end_at,
                self.tz,
            ),
        }
    }

    async fn job_loop(&self, job: Job, mut shutdown: watch::Receiver<bool>) {
        loop {
            let now = self.clock.now();
            let Some(fire_at) = self.next_fire(job, now) else {
                tracing::warn!(job = job.name(), "No upcoming run; timer disabled");
                return;
            };
            let wait = (fire_at - now).to_std().unwrap_or_default();
            tracing::debug!(job = job.name(), %fire_at, "Next run scheduled");

            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => return,
            }
            if *shutdown.borrow() {
                return;
            }
            self.fire(job, fire_at).await;
        }
    }

    async fn fire(&self, job: Job, fire_at: DateTime<Utc>) {
        let outcome = match job {
            Job::Escalation => self.run_escalation_now().await.map(|_| ()),
            Job::Reminders => self.run_reminders_now().await.map(|_| ()),
            Job::YearEnd => {
                let year = fire_at.with_timezone(&self.tz).year();
                self.run_year_end_now(year).await.map(|_| ())
            }
        };
        if let Err(err) = outcome {
            tracing::error!(job = job.name(), error = %err, "Scheduled job failed");
        }
    }
}
