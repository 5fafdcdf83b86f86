use crate::date_math::{RemainingDays, add_days, remaining_days, start_of_day};
use crate::model::{CropType, ScheduleEntry};
use serde::Serialize;
use time::{Date, OffsetDateTime};

pub const DEFAULT_DUE_SOON_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionBasis {
    PlantingDate,
    #[default]
    NextAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectedEntry {
    #[serde(flatten)]
    pub entry: ScheduleEntry,
    pub remaining: RemainingDays,
}

/// Date of the next follow-up action after planting.
pub fn next_action_date(crop_name: &str, planting_date: Date) -> Date {
    let days = match CropType::parse(crop_name) {
        Some(CropType::Potatoes) => 30,
        Some(CropType::Maize) => 40,
        None => 20,
    };
    add_days(planting_date, days)
}

/// Derived on every call; nothing here is persisted.
pub fn project(
    entries: &[ScheduleEntry],
    now: OffsetDateTime,
    basis: ProjectionBasis,
) -> Vec<ProjectedEntry> {
    entries
        .iter()
        .map(|entry| {
            let target = match basis {
                ProjectionBasis::PlantingDate => entry.planting_date,
                ProjectionBasis::NextAction => entry.planning_date,
            };
            ProjectedEntry {
                entry: entry.clone(),
                remaining: remaining_days(start_of_day(target, now.offset()), now),
            }
        })
        .collect()
}

/// Entries whose planting date is still ahead, at most `within_days` away.
pub fn due_soon(
    entries: &[ScheduleEntry],
    now: OffsetDateTime,
    within_days: i64,
) -> Vec<ProjectedEntry> {
    project(entries, now, ProjectionBasis::PlantingDate)
        .into_iter()
        .filter(|projected| matches!(projected.remaining.days(), Some(days) if days <= within_days))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ProjectionBasis, due_soon, next_action_date, project};
    use crate::date_math::RemainingDays;
    use crate::model::{EntryStatus, ScheduleEntry};
    use time::Date;
    use time::macros::{date, datetime};

    fn entry(farm: &str, planted: Date, planned: Date) -> ScheduleEntry {
        ScheduleEntry {
            id: Some(format!("doc-{farm}")),
            crop_name: "Ibigori".to_string(),
            user_id: "user-1".to_string(),
            farm_name: farm.to_string(),
            planting_date: planted,
            planning_date: planned,
            performed_actions: "Weeding".to_string(),
            action_performed_date: planted,
            status: EntryStatus::Pending,
            tasks: Vec::new(),
        }
    }

    #[test]
    fn next_action_offsets_per_crop() {
        let planted = date!(2024 - 03 - 01);
        assert_eq!(next_action_date("Ibirayi", planted), date!(2024 - 03 - 31));
        assert_eq!(next_action_date("Ibigori", planted), date!(2024 - 04 - 10));
        assert_eq!(next_action_date("Cassava", planted), date!(2024 - 03 - 21));
    }

    #[test]
    fn projection_uses_requested_basis() {
        let now = datetime!(2024-03-01 00:00 UTC);
        let entries = vec![entry("a", date!(2024 - 03 - 11), date!(2024 - 04 - 20))];

        let by_planting = project(&entries, now, ProjectionBasis::PlantingDate);
        let by_action = project(&entries, now, ProjectionBasis::NextAction);

        assert_eq!(by_planting[0].remaining, RemainingDays::Days(10));
        assert_eq!(by_action[0].remaining, RemainingDays::Days(50));
    }

    #[test]
    fn past_dates_project_as_expired() {
        let now = datetime!(2024-03-10 09:30 UTC);
        let entries = vec![
            entry("past", date!(2024 - 03 - 08), date!(2024 - 04 - 17)),
            entry("today", date!(2024 - 03 - 10), date!(2024 - 04 - 19)),
        ];

        let projected = project(&entries, now, ProjectionBasis::PlantingDate);
        assert_eq!(projected[0].remaining, RemainingDays::Expired);
        assert_eq!(projected[1].remaining, RemainingDays::Days(0));
    }

    #[test]
    fn due_soon_keeps_close_upcoming_entries() {
        let now = datetime!(2024-03-01 00:00 UTC);
        let entries = vec![
            entry("expired", date!(2024 - 02 - 20), date!(2024 - 03 - 31)),
            entry("tomorrow", date!(2024 - 03 - 02), date!(2024 - 04 - 11)),
            entry("edge", date!(2024 - 03 - 03), date!(2024 - 04 - 12)),
            entry("far", date!(2024 - 03 - 20), date!(2024 - 04 - 29)),
        ];

        let farms: Vec<String> = due_soon(&entries, now, 2)
            .into_iter()
            .map(|projected| projected.entry.farm_name)
            .collect();
        assert_eq!(farms, vec!["tomorrow".to_string(), "edge".to_string()]);
    }
}
