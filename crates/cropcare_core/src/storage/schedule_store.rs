//! Schedule entries held in two tiers: the remote document collection and
//! a per-user local cache that every listing reads from.
//!
//! Writes go to the remote store first and only then to the cache, so a
//! failed remote call never leaves the cache ahead of the remote copy.
//! Entries that were never synced (no remote id) are edited locally only.

use crate::error::AppError;
use crate::model::{CropType, EntryStatus, Locale, NewScheduleEntry, ScheduleEntry};
use crate::projection::next_action_date;
use crate::rules::tasks_for;
use crate::storage::document_store::{Document, DocumentStore, Subscription};
use crate::storage::{KeyValueStore, read_list, write_list};
use serde_json::json;
use tracing::{debug, info, warn};

pub const SCHEDULE_COLLECTION: &str = "PlantingSchedules";
const USER_FIELD: &str = "userId";
const LOCAL_SCHEDULE_KEY: &str = "localPlantingSchedule";

pub fn local_key(user_id: &str) -> String {
    format!("{LOCAL_SCHEDULE_KEY}:{user_id}")
}

/// Most recent planting first; entries planted the same day keep their
/// insertion order.
pub fn sort_entries(entries: &mut [ScheduleEntry]) {
    entries.sort_by(|a, b| b.planting_date.cmp(&a.planting_date));
}

#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub id: String,
    pub entry: ScheduleEntry,
    pub entries: Vec<ScheduleEntry>,
}

pub struct ScheduleStore<'a> {
    remote: &'a dyn DocumentStore,
    local: &'a dyn KeyValueStore,
}

impl<'a> ScheduleStore<'a> {
    pub fn new(remote: &'a dyn DocumentStore, local: &'a dyn KeyValueStore) -> Self {
        Self { remote, local }
    }

    /// The merged list as last written to the local cache.
    pub fn load(&self, user_id: &str) -> Result<Vec<ScheduleEntry>, AppError> {
        let user_id = require_user(user_id)?;
        let mut entries: Vec<ScheduleEntry> = read_list(self.local, &local_key(user_id))?;
        sort_entries(&mut entries);
        Ok(entries)
    }

    pub fn create(
        &self,
        draft: &NewScheduleEntry,
        locale: Locale,
    ) -> Result<CreateOutcome, AppError> {
        let crop = validate_draft(draft)?;
        let mut entry = ScheduleEntry {
            id: None,
            crop_name: crop.stored_name().to_string(),
            user_id: draft.user_id.trim().to_string(),
            farm_name: draft.farm_name.trim().to_string(),
            planting_date: draft.planting_date,
            planning_date: next_action_date(crop.stored_name(), draft.planting_date),
            performed_actions: draft.performed_actions.trim().to_string(),
            action_performed_date: draft.action_performed_date,
            status: EntryStatus::Pending,
            tasks: tasks_for(crop, draft.planting_date, locale),
        };

        let payload = serde_json::to_value(&entry)?;
        let id = self.remote.add(SCHEDULE_COLLECTION, payload)?;
        entry.id = Some(id.clone());

        let key = local_key(&entry.user_id);
        let mut entries: Vec<ScheduleEntry> = read_list(self.local, &key)?;
        entries.push(entry.clone());
        sort_entries(&mut entries);
        write_list(self.local, &key, &entries)?;

        info!(
            id = %id,
            crop = %entry.crop_name,
            planting_date = %entry.planting_date,
            "schedule entry created"
        );

        Ok(CreateOutcome { id, entry, entries })
    }

    /// One-shot pull of the remote set, replacing the cache.
    pub fn refresh(&self, user_id: &str) -> Result<Vec<ScheduleEntry>, AppError> {
        let user_id = require_user(user_id)?;
        let documents = self.remote.query(SCHEDULE_COLLECTION, USER_FIELD, user_id)?;
        replace_cache(self.local, user_id, documents)
    }

    pub fn subscribe(&self, user_id: &str) -> Result<ScheduleSubscription<'a>, AppError> {
        let user_id = require_user(user_id)?;
        let inner = self
            .remote
            .subscribe(SCHEDULE_COLLECTION, USER_FIELD, user_id)
            .map_err(|err| AppError::subscription(err.message().to_string()))?;

        Ok(ScheduleSubscription {
            local: self.local,
            user_id: user_id.to_string(),
            inner,
            finished: false,
        })
    }

    pub fn approve(&self, user_id: &str, index: usize) -> Result<ScheduleEntry, AppError> {
        self.advance(user_id, index, EntryStatus::Approved)
    }

    pub fn complete(&self, user_id: &str, index: usize) -> Result<ScheduleEntry, AppError> {
        self.advance(user_id, index, EntryStatus::Completed)
    }

    pub fn delete(&self, user_id: &str, index: usize) -> Result<ScheduleEntry, AppError> {
        let user_id = require_user(user_id)?;
        let mut entries = self.load(user_id)?;
        if index >= entries.len() {
            return Err(missing_index(index));
        }

        if let Some(id) = entries[index].id.as_deref() {
            self.remote.delete(SCHEDULE_COLLECTION, id)?;
        }

        let removed = entries.remove(index);
        write_list(self.local, &local_key(user_id), &entries)?;
        info!(crop = %removed.crop_name, farm = %removed.farm_name, "schedule entry deleted");

        Ok(removed)
    }

    fn advance(
        &self,
        user_id: &str,
        index: usize,
        target: EntryStatus,
    ) -> Result<ScheduleEntry, AppError> {
        let user_id = require_user(user_id)?;
        let mut entries = self.load(user_id)?;
        let entry = entries.get_mut(index).ok_or_else(|| missing_index(index))?;

        let next = entry.status.advance_to(target)?;
        if next == entry.status {
            return Ok(entry.clone());
        }

        if let Some(id) = entry.id.as_deref() {
            self.remote
                .update(SCHEDULE_COLLECTION, id, json!({ "status": next.label() }))?;
        }

        entry.status = next;
        let updated = entry.clone();
        write_list(self.local, &local_key(user_id), &entries)?;
        info!(status = next.label(), farm = %updated.farm_name, "schedule entry status changed");

        Ok(updated)
    }
}

/// Live view of a user's remote entries. Each emission overwrites the local
/// cache and yields the sorted list. A failed emission is yielded once and
/// ends the sequence.
pub struct ScheduleSubscription<'a> {
    local: &'a dyn KeyValueStore,
    user_id: String,
    inner: Subscription,
    finished: bool,
}

impl Iterator for ScheduleSubscription<'_> {
    type Item = Result<Vec<ScheduleEntry>, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.inner.next()? {
            Ok(documents) => Some(replace_cache(self.local, &self.user_id, documents)),
            Err(err) => {
                self.finished = true;
                warn!(user_id = %self.user_id, error = %err, "schedule subscription failed");
                Some(Err(AppError::subscription(err.message().to_string())))
            }
        }
    }
}

fn replace_cache(
    local: &dyn KeyValueStore,
    user_id: &str,
    documents: Vec<Document>,
) -> Result<Vec<ScheduleEntry>, AppError> {
    let mut entries = documents
        .into_iter()
        .map(entry_from_document)
        .collect::<Result<Vec<_>, _>>()?;
    sort_entries(&mut entries);
    write_list(local, &local_key(user_id), &entries)?;
    debug!(user_id, count = entries.len(), "local schedule cache replaced");
    Ok(entries)
}

fn entry_from_document(document: Document) -> Result<ScheduleEntry, AppError> {
    let mut entry: ScheduleEntry = serde_json::from_value(document.data)?;
    entry.id = Some(document.id);
    Ok(entry)
}

fn require_user(user_id: &str) -> Result<&str, AppError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("user id is required"));
    }
    Ok(trimmed)
}

fn missing_index(index: usize) -> AppError {
    AppError::invalid_input(format!("no schedule entry at index {index}"))
}

pub fn validate_draft(draft: &NewScheduleEntry) -> Result<CropType, AppError> {
    require_user(&draft.user_id)?;
    let crop = CropType::parse(&draft.crop_name)
        .ok_or_else(|| AppError::invalid_input("crop must be Ibigori or Ibirayi"))?;
    if draft.farm_name.trim().is_empty() {
        return Err(AppError::invalid_input("farm name is required"));
    }
    if draft.performed_actions.trim().is_empty() {
        return Err(AppError::invalid_input("performed actions are required"));
    }
    Ok(crop)
}
