//! Turns task lists and crop reminder chains into notification requests.
//!
//! Every fan-out is a batch keyed by user, crop, planting date and kind.
//! A batch already in the ledger is skipped, and requests inside a batch
//! are sent one by one so a failing request never stops the rest.

use crate::date_math::{TimeUnit, add_offset, start_of_day};
use crate::error::AppError;
use crate::model::{BatchKey, BatchKind, CropTask, CropType, NotificationRequest, Trigger};
use crate::notify::{NotificationScheduler, PermissionStatus};
use crate::storage::{KeyValueStore, read_list, write_list};
use time::{Date, Duration, OffsetDateTime, UtcOffset};
use tracing::{debug, info, warn};

pub const BATCH_LEDGER_KEY: &str = "reminderBatches";
pub const DEFAULT_WEEKLY_WEEKS: u32 = 12;

pub const TASK_TITLE: &str = "Kazi mu bijyanye n’ubuhinzi";
pub const INITIAL_TITLE: &str = "CropCare Reminder";
pub const WEEKLY_TITLE: &str = "CropCare Weekly Reminder";
const GENERIC_BODY: &str = "Remember to check your crops!";

#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    pub scheduled: usize,
    pub failures: Vec<RequestFailure>,
    pub permission_denied: bool,
    pub skipped: usize,
}

impl ScheduleOutcome {
    pub fn merge(&mut self, other: ScheduleOutcome) {
        self.scheduled += other.scheduled;
        self.failures.extend(other.failures);
        self.permission_denied |= other.permission_denied;
        self.skipped += other.skipped;
    }
}

#[derive(Debug)]
pub struct RequestFailure {
    pub title: String,
    pub error: AppError,
}

pub fn initial_body(crop_name: &str) -> String {
    match CropType::parse(crop_name) {
        Some(crop) => format!(
            "It's time to apply insecticide to your {}. Keep your crops healthy!",
            crop.stored_name()
        ),
        None => GENERIC_BODY.to_string(),
    }
}

pub fn weekly_body(crop_name: &str, week: u32) -> &'static str {
    match CropType::parse(crop_name) {
        Some(CropType::Potatoes) if week % 2 == 0 => {
            "Time to apply fertilizer to boost potato growth."
        }
        Some(CropType::Potatoes) => "Check for pests and diseases in your potato fields.",
        Some(CropType::Maize) if week % 3 == 0 => {
            "Apply pest control to protect your Ibigori crops from insects."
        }
        Some(CropType::Maize) => "Irrigate your Ibigori fields to maintain soil moisture.",
        None => GENERIC_BODY,
    }
}

pub struct ReminderScheduler<'a> {
    primitive: &'a dyn NotificationScheduler,
    ledger: &'a dyn KeyValueStore,
    offset: UtcOffset,
    weekly_weeks: u32,
}

impl<'a> ReminderScheduler<'a> {
    pub fn new(primitive: &'a dyn NotificationScheduler, ledger: &'a dyn KeyValueStore) -> Self {
        Self {
            primitive,
            ledger,
            offset: UtcOffset::UTC,
            weekly_weeks: DEFAULT_WEEKLY_WEEKS,
        }
    }

    /// Offset in which calendar dates start; normally the local one.
    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_weekly_weeks(mut self, weeks: u32) -> Self {
        self.weekly_weeks = weeks;
        self
    }

    pub fn schedule_tasks(
        &self,
        user_id: &str,
        crop_name: &str,
        planting_date: Date,
        tasks: &[CropTask],
    ) -> Result<ScheduleOutcome, AppError> {
        let key = batch_key(user_id, crop_name, planting_date, BatchKind::Tasks);
        let requests = tasks
            .iter()
            .map(|task| NotificationRequest {
                title: TASK_TITLE.to_string(),
                body: task.description.clone(),
                trigger: Trigger::At(start_of_day(task.date, self.offset)),
                batch: Some(key.clone()),
            })
            .collect();

        self.run_batch(Some(key), requests)
    }

    /// One reminder a month after planting, then the weekly chain from there.
    pub fn schedule_initial(
        &self,
        user_id: &str,
        crop_name: &str,
        planting_date: Date,
    ) -> Result<ScheduleOutcome, AppError> {
        let first = add_offset(start_of_day(planting_date, self.offset), 1, TimeUnit::Months);
        let key = batch_key(user_id, crop_name, planting_date, BatchKind::Initial);
        let request = NotificationRequest {
            title: INITIAL_TITLE.to_string(),
            body: initial_body(crop_name),
            trigger: Trigger::At(first),
            batch: Some(key.clone()),
        };

        let mut outcome = self.run_batch(Some(key), vec![request])?;
        if outcome.permission_denied {
            return Ok(outcome);
        }

        outcome.merge(self.schedule_weekly(user_id, crop_name, planting_date, first)?);
        Ok(outcome)
    }

    pub fn schedule_weekly(
        &self,
        user_id: &str,
        crop_name: &str,
        planting_date: Date,
        start: OffsetDateTime,
    ) -> Result<ScheduleOutcome, AppError> {
        let key = batch_key(user_id, crop_name, planting_date, BatchKind::Weekly);
        let requests = (1..=self.weekly_weeks)
            .map(|week| NotificationRequest {
                title: WEEKLY_TITLE.to_string(),
                body: weekly_body(crop_name, week).to_string(),
                trigger: Trigger::At(start.saturating_add(Duration::days(7 * i64::from(week)))),
                batch: Some(key.clone()),
            })
            .collect();

        self.run_batch(Some(key), requests)
    }

    /// Ad-hoc reminder firing `seconds` from now. Never de-duplicated.
    pub fn schedule_custom(
        &self,
        title: &str,
        body: &str,
        seconds: u64,
    ) -> Result<ScheduleOutcome, AppError> {
        if title.trim().is_empty() {
            return Err(AppError::invalid_input("title is required"));
        }
        if body.trim().is_empty() {
            return Err(AppError::invalid_input("body is required"));
        }
        if seconds == 0 {
            return Err(AppError::invalid_input("seconds must be greater than zero"));
        }

        let request = NotificationRequest {
            title: title.trim().to_string(),
            body: body.trim().to_string(),
            trigger: Trigger::After { seconds },
            batch: None,
        };
        self.run_batch(None, vec![request])
    }

    pub fn batches(&self) -> Result<Vec<BatchKey>, AppError> {
        read_list(self.ledger, BATCH_LEDGER_KEY)
    }

    /// An unreadable ledger counts as empty; the next write replaces it.
    fn recorded_batches(&self) -> Vec<BatchKey> {
        self.batches().unwrap_or_else(|err| {
            warn!(error = %err, "reminder batch ledger unreadable");
            Vec::new()
        })
    }

    fn run_batch(
        &self,
        key: Option<BatchKey>,
        requests: Vec<NotificationRequest>,
    ) -> Result<ScheduleOutcome, AppError> {
        if requests.is_empty() {
            return Ok(ScheduleOutcome::default());
        }

        if let Some(key) = key.as_ref()
            && self.recorded_batches().contains(key)
        {
            debug!(kind = ?key.kind, crop = %key.crop_name, "reminder batch already scheduled");
            return Ok(ScheduleOutcome {
                skipped: requests.len(),
                ..ScheduleOutcome::default()
            });
        }

        if self.primitive.request_permissions()? == PermissionStatus::Denied {
            warn!("notification permission denied, reminders not scheduled");
            return Ok(ScheduleOutcome {
                permission_denied: true,
                ..ScheduleOutcome::default()
            });
        }

        let mut outcome = ScheduleOutcome::default();
        for request in &requests {
            match self.primitive.schedule(request) {
                Ok(()) => outcome.scheduled += 1,
                Err(err) => {
                    warn!(title = %request.title, error = %err, "reminder request failed");
                    outcome.failures.push(RequestFailure {
                        title: request.title.clone(),
                        error: err,
                    });
                }
            }
        }

        if outcome.scheduled > 0
            && let Some(key) = key
        {
            let mut ledger = self.recorded_batches();
            ledger.push(key);
            if let Err(err) = write_list(self.ledger, BATCH_LEDGER_KEY, &ledger) {
                warn!(error = %err, "reminder batch ledger not updated");
                outcome.failures.push(RequestFailure {
                    title: BATCH_LEDGER_KEY.to_string(),
                    error: err,
                });
            }
        }

        info!(
            scheduled = outcome.scheduled,
            failed = outcome.failures.len(),
            "reminder batch sent"
        );
        Ok(outcome)
    }
}

fn batch_key(user_id: &str, crop_name: &str, planting_date: Date, kind: BatchKind) -> BatchKey {
    BatchKey {
        user_id: user_id.to_string(),
        crop_name: crop_name.trim().to_string(),
        planting_date,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BATCH_LEDGER_KEY, INITIAL_TITLE, ReminderScheduler, TASK_TITLE, WEEKLY_TITLE, weekly_body,
    };
    use crate::error::AppError;
    use crate::model::{Locale, NotificationRequest, Trigger};
    use crate::notify::{NotificationScheduler, PermissionStatus};
    use crate::rules::generate_tasks;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::cell::{Cell, RefCell};
    use time::macros::{date, datetime};

    struct RecordingPrimitive {
        permission: PermissionStatus,
        requests: RefCell<Vec<NotificationRequest>>,
        fail_on: Option<usize>,
        calls: Cell<usize>,
    }

    impl RecordingPrimitive {
        fn granted() -> Self {
            Self {
                permission: PermissionStatus::Granted,
                requests: RefCell::new(Vec::new()),
                fail_on: None,
                calls: Cell::new(0),
            }
        }
    }

    impl NotificationScheduler for RecordingPrimitive {
        fn request_permissions(&self) -> Result<PermissionStatus, AppError> {
            Ok(self.permission)
        }

        fn schedule(&self, request: &NotificationRequest) -> Result<(), AppError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if self.fail_on == Some(call) {
                return Err(AppError::io("notification service unavailable"));
            }
            self.requests.borrow_mut().push(request.clone());
            Ok(())
        }
    }

    #[test]
    fn task_reminders_follow_task_dates() {
        let primitive = RecordingPrimitive::granted();
        let ledger = MemoryStore::new();
        let scheduler = ReminderScheduler::new(&primitive, &ledger);
        let tasks = generate_tasks("Ibirayi", date!(2024 - 03 - 01), Locale::Kinyarwanda);

        let outcome = scheduler
            .schedule_tasks("user-1", "Ibirayi", date!(2024 - 03 - 01), &tasks)
            .unwrap();
        let requests = primitive.requests.borrow();

        assert_eq!(outcome.scheduled, 6);
        assert_eq!(requests[0].title, TASK_TITLE);
        assert_eq!(requests[0].body, "Gutera Ibirayi");
        assert_eq!(requests[5].trigger, Trigger::At(datetime!(2024-06-29 00:00 UTC)));
    }

    #[test]
    fn initial_reminder_then_weekly_chain() {
        let primitive = RecordingPrimitive::granted();
        let ledger = MemoryStore::new();
        let scheduler = ReminderScheduler::new(&primitive, &ledger);

        let outcome = scheduler
            .schedule_initial("user-1", "Ibirayi", date!(2024 - 03 - 01))
            .unwrap();
        let requests = primitive.requests.borrow();

        assert_eq!(outcome.scheduled, 13);
        assert_eq!(requests[0].title, INITIAL_TITLE);
        assert_eq!(
            requests[0].body,
            "It's time to apply insecticide to your Ibirayi. Keep your crops healthy!"
        );
        // 2_628_000 seconds is 30 days and 10 hours.
        assert_eq!(requests[0].trigger, Trigger::At(datetime!(2024-03-31 10:00 UTC)));
        assert_eq!(requests[1].title, WEEKLY_TITLE);
        assert_eq!(requests[1].trigger, Trigger::At(datetime!(2024-04-07 10:00 UTC)));
        assert_eq!(requests[12].trigger, Trigger::At(datetime!(2024-06-23 10:00 UTC)));
        assert_eq!(requests[1].body, "Check for pests and diseases in your potato fields.");
        assert_eq!(requests[2].body, "Time to apply fertilizer to boost potato growth.");
    }

    #[test]
    fn weekly_messages_alternate_per_crop() {
        assert_eq!(
            weekly_body("Ibigori", 3),
            "Apply pest control to protect your Ibigori crops from insects."
        );
        assert_eq!(
            weekly_body("Ibigori", 4),
            "Irrigate your Ibigori fields to maintain soil moisture."
        );
        assert_eq!(weekly_body("Cassava", 1), "Remember to check your crops!");
    }

    #[test]
    fn weekly_chain_length_is_configurable() {
        let primitive = RecordingPrimitive::granted();
        let ledger = MemoryStore::new();
        let scheduler = ReminderScheduler::new(&primitive, &ledger).with_weekly_weeks(4);

        let outcome = scheduler
            .schedule_weekly(
                "user-1",
                "Ibigori",
                date!(2024 - 01 - 01),
                datetime!(2024-02-01 00:00 UTC),
            )
            .unwrap();

        assert_eq!(outcome.scheduled, 4);
    }

    #[test]
    fn repeating_a_batch_schedules_nothing_new() {
        let primitive = RecordingPrimitive::granted();
        let ledger = MemoryStore::new();
        let scheduler = ReminderScheduler::new(&primitive, &ledger);

        scheduler
            .schedule_initial("user-1", "Ibigori", date!(2024 - 03 - 01))
            .unwrap();
        let repeat = scheduler
            .schedule_initial("user-1", "Ibigori", date!(2024 - 03 - 01))
            .unwrap();

        assert_eq!(repeat.scheduled, 0);
        assert_eq!(repeat.skipped, 13);
        assert_eq!(primitive.requests.borrow().len(), 13);
        assert_eq!(scheduler.batches().unwrap().len(), 2);

        let other_date = scheduler
            .schedule_initial("user-1", "Ibigori", date!(2024 - 04 - 01))
            .unwrap();
        assert_eq!(other_date.scheduled, 13);
    }

    #[test]
    fn unknown_crop_gets_generic_reminders_only() {
        let primitive = RecordingPrimitive::granted();
        let ledger = MemoryStore::new();
        let scheduler = ReminderScheduler::new(&primitive, &ledger);
        let tasks = generate_tasks("Cassava", date!(2024 - 03 - 01), Locale::English);

        let task_outcome = scheduler
            .schedule_tasks("user-1", "Cassava", date!(2024 - 03 - 01), &tasks)
            .unwrap();
        let initial = scheduler
            .schedule_initial("user-1", "Cassava", date!(2024 - 03 - 01))
            .unwrap();
        let requests = primitive.requests.borrow();

        assert_eq!(task_outcome.scheduled, 0);
        assert_eq!(initial.scheduled, 13);
        assert!(requests.iter().all(|request| request.title != TASK_TITLE));
        assert!(
            requests
                .iter()
                .all(|request| request.body == "Remember to check your crops!")
        );
    }

    #[test]
    fn failing_request_does_not_stop_the_batch() {
        let primitive = RecordingPrimitive {
            fail_on: Some(2),
            ..RecordingPrimitive::granted()
        };
        let ledger = MemoryStore::new();
        let scheduler = ReminderScheduler::new(&primitive, &ledger);
        let tasks = generate_tasks("Ibigori", date!(2024 - 03 - 01), Locale::English);

        let outcome = scheduler
            .schedule_tasks("user-1", "Ibigori", date!(2024 - 03 - 01), &tasks)
            .unwrap();

        assert_eq!(outcome.scheduled, 5);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].error.code(), "io_error");
        assert_eq!(primitive.calls.get(), 6);
        assert_eq!(scheduler.batches().unwrap().len(), 1);
    }

    #[test]
    fn all_failed_batch_is_not_recorded() {
        struct BrokenPrimitive;

        impl NotificationScheduler for BrokenPrimitive {
            fn request_permissions(&self) -> Result<PermissionStatus, AppError> {
                Ok(PermissionStatus::Granted)
            }

            fn schedule(&self, _request: &NotificationRequest) -> Result<(), AppError> {
                Err(AppError::io("offline"))
            }
        }

        let ledger = MemoryStore::new();
        let scheduler = ReminderScheduler::new(&BrokenPrimitive, &ledger);
        let outcome = scheduler
            .schedule_initial("user-1", "Ibirayi", date!(2024 - 03 - 01))
            .unwrap();

        assert_eq!(outcome.scheduled, 0);
        assert_eq!(outcome.failures.len(), 13);
        assert!(ledger.get_item(BATCH_LEDGER_KEY).unwrap().is_none());
    }

    #[test]
    fn corrupt_ledger_is_replaced_instead_of_failing() {
        let primitive = RecordingPrimitive::granted();
        let ledger = MemoryStore::new();
        ledger.set_item(BATCH_LEDGER_KEY, "{not a list").unwrap();
        let scheduler = ReminderScheduler::new(&primitive, &ledger);

        let outcome = scheduler
            .schedule_initial("user-1", "Ibirayi", date!(2024 - 03 - 01))
            .unwrap();
        let repeat = scheduler
            .schedule_initial("user-1", "Ibirayi", date!(2024 - 03 - 01))
            .unwrap();

        assert_eq!(outcome.scheduled, 13);
        assert!(outcome.failures.is_empty());
        assert_eq!(scheduler.batches().unwrap().len(), 2);
        assert_eq!(repeat.scheduled, 0);
        assert_eq!(repeat.skipped, 13);
    }

    #[test]
    fn denied_permission_schedules_nothing() {
        let primitive = RecordingPrimitive {
            permission: PermissionStatus::Denied,
            ..RecordingPrimitive::granted()
        };
        let ledger = MemoryStore::new();
        let scheduler = ReminderScheduler::new(&primitive, &ledger);

        let outcome = scheduler
            .schedule_initial("user-1", "Ibirayi", date!(2024 - 03 - 01))
            .unwrap();

        assert!(outcome.permission_denied);
        assert_eq!(outcome.scheduled, 0);
        assert_eq!(primitive.calls.get(), 0);
        assert!(scheduler.batches().unwrap().is_empty());
    }

    #[test]
    fn custom_reminder_validates_input() {
        let primitive = RecordingPrimitive::granted();
        let ledger = MemoryStore::new();
        let scheduler = ReminderScheduler::new(&primitive, &ledger);

        assert_eq!(
            scheduler.schedule_custom(" ", "body", 60).unwrap_err().code(),
            "invalid_input"
        );
        assert_eq!(
            scheduler.schedule_custom("title", "", 60).unwrap_err().code(),
            "invalid_input"
        );
        assert_eq!(
            scheduler.schedule_custom("title", "body", 0).unwrap_err().code(),
            "invalid_input"
        );

        let outcome = scheduler.schedule_custom("Water", "Water the seedlings", 90).unwrap();
        assert_eq!(outcome.scheduled, 1);
        assert_eq!(
            primitive.requests.borrow()[0].trigger,
            Trigger::After { seconds: 90 }
        );
        assert!(scheduler.batches().unwrap().is_empty());
    }
}
