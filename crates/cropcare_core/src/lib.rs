pub mod config;
pub mod crop_api;
pub mod date_math;
pub mod error;
pub mod identity;
pub mod model;
pub mod notify;
pub mod projection;
pub mod reminder_scheduler;
pub mod rules;
pub mod storage;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{CropType, EntryStatus, ScheduleEntry};
    use time::macros::date;

    #[test]
    fn schedule_entry_has_required_fields() {
        let entry = ScheduleEntry {
            id: None,
            crop_name: CropType::Maize.stored_name().to_string(),
            user_id: "farmer-1".to_string(),
            farm_name: "Nyagatare".to_string(),
            planting_date: date!(2024 - 09 - 15),
            planning_date: date!(2024 - 10 - 25),
            performed_actions: "Ploughing".to_string(),
            action_performed_date: date!(2024 - 09 - 15),
            status: EntryStatus::default(),
            tasks: Vec::new(),
        };

        assert_eq!(entry.crop_name, "Ibigori");
        assert_eq!(entry.status, EntryStatus::Pending);
        assert!(entry.id.is_none());
        assert!(entry.tasks.is_empty());
    }

    #[test]
    fn app_error_exposes_code_and_message() {
        let err = AppError::remote("network unreachable");
        assert_eq!(err.code(), "remote_error");
        assert_eq!(err.message(), "network unreachable");
        assert_eq!(err.to_string(), "remote_error - network unreachable");
    }
}
