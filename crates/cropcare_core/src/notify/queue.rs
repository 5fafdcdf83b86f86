//! Local stand-in for the device notification subsystem.
//!
//! Scheduled requests become `Reminder` records in the key-value store. They
//! are delivered later by `dispatch_due`, which hands every reminder whose
//! time has come to a desktop `Notifier`.

use crate::date_math::{RemainingDays, remaining_days};
use crate::error::AppError;
use crate::model::{NotificationRequest, Reminder, Trigger};
use crate::notify::{NotificationScheduler, Notifier, PermissionStatus};
use crate::storage::{KeyValueStore, read_list, write_list};
use serde::Serialize;
use std::cell::Cell;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

pub const REMINDERS_KEY: &str = "reminders";

#[derive(Debug, Clone, Serialize)]
pub struct QueuedReminder {
    #[serde(flatten)]
    pub reminder: Reminder,
    pub remaining: RemainingDays,
}

#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub delivered: Vec<Reminder>,
    pub failures: Vec<DispatchFailure>,
}

#[derive(Debug)]
pub struct DispatchFailure {
    pub reminder_id: String,
    pub error: AppError,
}

pub struct LocalReminderQueue<'a> {
    store: &'a dyn KeyValueStore,
    permission: PermissionStatus,
    issued_at: OffsetDateTime,
    sequence: Cell<u64>,
}

impl<'a> LocalReminderQueue<'a> {
    pub fn new(store: &'a dyn KeyValueStore, permission: PermissionStatus) -> Self {
        Self {
            store,
            permission,
            issued_at: OffsetDateTime::now_utc(),
            sequence: Cell::new(0),
        }
    }

    /// Base instant for `Trigger::After` requests.
    pub fn issued_at(mut self, now: OffsetDateTime) -> Self {
        self.issued_at = now;
        self
    }

    pub fn load(&self) -> Result<Vec<Reminder>, AppError> {
        read_list(self.store, REMINDERS_KEY)
    }

    /// Every stored reminder, soonest first, with its days remaining.
    pub fn list(&self, now: OffsetDateTime) -> Result<Vec<QueuedReminder>, AppError> {
        let mut reminders = self.load()?;
        reminders.sort_by_key(|reminder| reminder.fire_at);

        Ok(reminders
            .into_iter()
            .map(|reminder| {
                let remaining = remaining_days(reminder.fire_at, now);
                QueuedReminder {
                    reminder,
                    remaining,
                }
            })
            .collect())
    }

    pub fn dispatch_due(
        &self,
        now: OffsetDateTime,
        notifier: &dyn Notifier,
    ) -> Result<DispatchOutcome, AppError> {
        let mut reminders = self.load()?;
        let mut outcome = DispatchOutcome::default();

        for reminder in &mut reminders {
            if reminder.delivered || reminder.fire_at > now {
                continue;
            }

            match notifier.notify(reminder) {
                Ok(()) => {
                    reminder.delivered = true;
                    outcome.delivered.push(reminder.clone());
                }
                Err(err) => {
                    warn!(id = %reminder.id, error = %err, "reminder delivery failed");
                    outcome.failures.push(DispatchFailure {
                        reminder_id: reminder.id.clone(),
                        error: err,
                    });
                }
            }
        }

        if !outcome.delivered.is_empty() {
            write_list(self.store, REMINDERS_KEY, &reminders)?;
            info!(count = outcome.delivered.len(), "reminders delivered");
        }

        Ok(outcome)
    }

    fn next_id(&self) -> String {
        let sequence = self.sequence.get() + 1;
        self.sequence.set(sequence);
        format!(
            "rem-{}-{sequence}",
            OffsetDateTime::now_utc().unix_timestamp_nanos()
        )
    }

    fn fire_at(&self, trigger: Trigger) -> OffsetDateTime {
        match trigger {
            Trigger::At(instant) => instant,
            Trigger::After { seconds } => {
                let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
                self.issued_at.saturating_add(Duration::seconds(seconds))
            }
        }
    }
}

impl NotificationScheduler for LocalReminderQueue<'_> {
    fn request_permissions(&self) -> Result<PermissionStatus, AppError> {
        Ok(self.permission)
    }

    fn schedule(&self, request: &NotificationRequest) -> Result<(), AppError> {
        if self.permission == PermissionStatus::Denied {
            return Err(AppError::permission_denied("notifications are disabled"));
        }

        let reminder = Reminder {
            id: self.next_id(),
            batch: request.batch.clone(),
            title: request.title.clone(),
            body: request.body.clone(),
            fire_at: self.fire_at(request.trigger),
            delivered: false,
        };

        let mut reminders = self.load()?;
        debug!(id = %reminder.id, fire_at = %reminder.fire_at, "reminder queued");
        reminders.push(reminder);
        write_list(self.store, REMINDERS_KEY, &reminders)
    }
}
