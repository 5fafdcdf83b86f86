mod crop;
mod reminder;
mod schedule;

pub use crop::{CropTask, CropType, Locale};
pub use reminder::{BatchKey, BatchKind, NotificationRequest, Reminder, Trigger};
pub use schedule::{EntryStatus, NewScheduleEntry, ScheduleEntry};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");
