use crate::error::AppError;
use crate::model::CropTask;
use serde::{Deserialize, Serialize};
use time::Date;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub crop_name: String,
    pub user_id: String,
    pub farm_name: String,
    #[serde(with = "crate::model::iso_date")]
    pub planting_date: Date,
    #[serde(with = "crate::model::iso_date")]
    pub planning_date: Date,
    pub performed_actions: String,
    #[serde(with = "crate::model::iso_date")]
    pub action_performed_date: Date,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(default)]
    pub tasks: Vec<CropTask>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    #[default]
    Pending,
    Approved,
    Completed,
}

impl EntryStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Completed => "Completed",
        }
    }

    /// Moves the status forward. Re-approving an approved entry keeps it
    /// approved; nothing ever moves back to `Pending`.
    pub fn advance_to(self, target: EntryStatus) -> Result<EntryStatus, AppError> {
        match (self, target) {
            (Self::Completed, _) => Err(AppError::invalid_input("entry already completed")),
            (_, Self::Pending) => Err(AppError::invalid_input(
                "status cannot move back to Pending",
            )),
            (Self::Pending, next) => Ok(next),
            (Self::Approved, next) => Ok(next),
        }
    }
}

/// Fields a user supplies when recording a planting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduleEntry {
    pub user_id: String,
    pub crop_name: String,
    pub farm_name: String,
    pub planting_date: Date,
    pub performed_actions: String,
    pub action_performed_date: Date,
}
