use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    Tasks,
    Initial,
    Weekly,
    Custom,
}

/// Identifies one fan-out of notification requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchKey {
    pub user_id: String,
    pub crop_name: String,
    #[serde(with = "crate::model::iso_date")]
    pub planting_date: Date,
    pub kind: BatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    At(OffsetDateTime),
    After { seconds: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub trigger: Trigger,
    pub batch: Option<BatchKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchKey>,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub fire_at: OffsetDateTime,
    #[serde(default)]
    pub delivered: bool,
}
