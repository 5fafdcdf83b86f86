use crate::error::AppError;
use crate::model::Reminder;
use crate::notify::{APP_NAME, Notifier};
use notify_rust::Notification;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.appname(APP_NAME);
        notification.summary(&reminder.title);
        notification.body(&reminder.body);

        notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        Ok(())
    }
}
