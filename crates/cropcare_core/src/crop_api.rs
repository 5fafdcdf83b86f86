use crate::config::Config;
use crate::error::AppError;
use crate::model::{CropTask, CropType, Locale, NewScheduleEntry, ScheduleEntry};
use crate::notify::queue::{DispatchOutcome, LocalReminderQueue, QueuedReminder};
use crate::notify::{Notifier, PermissionStatus};
use crate::projection::{ProjectedEntry, ProjectionBasis, due_soon, project};
use crate::reminder_scheduler::{
    INITIAL_TITLE, ReminderScheduler, RequestFailure, ScheduleOutcome, TASK_TITLE,
};
use crate::storage::document_store::KvDocumentStore;
use crate::storage::json_store::{self, JsonFileStore};
use crate::storage::schedule_store::{ScheduleStore, ScheduleSubscription};
use std::path::PathBuf;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{info, warn};

/// The two persistence tiers every flow works against.
pub struct Stores {
    pub local: JsonFileStore,
    pub remote: KvDocumentStore<JsonFileStore>,
}

impl Stores {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::at(json_store::store_path()?, json_store::remote_path()?))
    }

    pub fn at<L: Into<PathBuf>, R: Into<PathBuf>>(local: L, remote: R) -> Self {
        Self {
            local: JsonFileStore::new(local),
            remote: KvDocumentStore::new(JsonFileStore::new(remote)),
        }
    }

    pub fn schedules(&self) -> ScheduleStore<'_> {
        ScheduleStore::new(&self.remote, &self.local)
    }

    fn reminder_queue(&self, config: &Config) -> LocalReminderQueue<'_> {
        let permission = if config.notifications {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        LocalReminderQueue::new(&self.local, permission)
    }
}

#[derive(Debug)]
pub struct PlanOutcome {
    pub entry: ScheduleEntry,
    pub entries: Vec<ScheduleEntry>,
    pub reminders: ScheduleOutcome,
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

/// Saves the planting, then schedules its task reminders, the one-month
/// reminder and the weekly chain. Once the entry is saved, reminder
/// problems only show up in the outcome.
pub fn plan_crop(
    stores: &Stores,
    draft: &NewScheduleEntry,
    config: &Config,
) -> Result<PlanOutcome, AppError> {
    let created = stores.schedules().create(draft, config.locale)?;
    let entry = created.entry;

    let queue = stores.reminder_queue(config);
    let scheduler = ReminderScheduler::new(&queue, &stores.local)
        .with_offset(local_offset())
        .with_weekly_weeks(config.weekly_reminder_weeks);

    let mut reminders = ScheduleOutcome::default();
    let batches = [
        (
            TASK_TITLE,
            scheduler.schedule_tasks(
                &entry.user_id,
                &entry.crop_name,
                entry.planting_date,
                &entry.tasks,
            ),
        ),
        (
            INITIAL_TITLE,
            scheduler.schedule_initial(&entry.user_id, &entry.crop_name, entry.planting_date),
        ),
    ];
    for (title, result) in batches {
        match result {
            Ok(outcome) => reminders.merge(outcome),
            Err(err) => {
                warn!(title, error = %err, "reminders not scheduled for saved entry");
                reminders.failures.push(RequestFailure {
                    title: title.to_string(),
                    error: err,
                });
            }
        }
    }

    info!(
        crop = %entry.crop_name,
        scheduled = reminders.scheduled,
        permission_denied = reminders.permission_denied,
        "crop planned"
    );

    Ok(PlanOutcome {
        entry,
        entries: created.entries,
        reminders,
    })
}

pub fn preview_tasks(
    crop_name: &str,
    planting_date: Date,
    locale: Locale,
) -> Result<Vec<CropTask>, AppError> {
    let crop = CropType::parse(crop_name)
        .ok_or_else(|| AppError::invalid_input("crop must be Ibigori or Ibirayi"))?;
    Ok(crate::rules::tasks_for(crop, planting_date, locale))
}

pub fn list_entries(
    stores: &Stores,
    user_id: &str,
    basis: ProjectionBasis,
    now: OffsetDateTime,
) -> Result<Vec<ProjectedEntry>, AppError> {
    let entries = stores.schedules().load(user_id)?;
    Ok(project(&entries, now, basis))
}

pub fn upcoming_entries(
    stores: &Stores,
    user_id: &str,
    within_days: i64,
    now: OffsetDateTime,
) -> Result<Vec<ProjectedEntry>, AppError> {
    let entries = stores.schedules().load(user_id)?;
    Ok(due_soon(&entries, now, within_days))
}

pub fn approve_entry(stores: &Stores, user_id: &str, index: usize) -> Result<ScheduleEntry, AppError> {
    stores.schedules().approve(user_id, index)
}

pub fn complete_entry(
    stores: &Stores,
    user_id: &str,
    index: usize,
) -> Result<ScheduleEntry, AppError> {
    stores.schedules().complete(user_id, index)
}

pub fn delete_entry(stores: &Stores, user_id: &str, index: usize) -> Result<ScheduleEntry, AppError> {
    stores.schedules().delete(user_id, index)
}

/// Replaces the local cache with the user's remote entries.
pub fn sync_entries(stores: &Stores, user_id: &str) -> Result<Vec<ScheduleEntry>, AppError> {
    stores.schedules().refresh(user_id)
}

pub fn watch_entries<'a>(
    stores: &'a Stores,
    user_id: &str,
) -> Result<ScheduleSubscription<'a>, AppError> {
    stores.schedules().subscribe(user_id)
}

pub fn list_reminders(stores: &Stores, now: OffsetDateTime) -> Result<Vec<QueuedReminder>, AppError> {
    LocalReminderQueue::new(&stores.local, PermissionStatus::Granted).list(now)
}

pub fn add_custom_reminder(
    stores: &Stores,
    title: &str,
    body: &str,
    seconds: u64,
    config: &Config,
) -> Result<ScheduleOutcome, AppError> {
    let queue = stores.reminder_queue(config);
    ReminderScheduler::new(&queue, &stores.local).schedule_custom(title, body, seconds)
}

pub fn dispatch_due_reminders(
    stores: &Stores,
    now: OffsetDateTime,
    notifier: &dyn Notifier,
) -> Result<DispatchOutcome, AppError> {
    LocalReminderQueue::new(&stores.local, PermissionStatus::Granted).dispatch_due(now, notifier)
}
