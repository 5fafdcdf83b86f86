use crate::error::AppError;
use crate::model::{NotificationRequest, Reminder};

pub mod queue;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

pub const APP_NAME: &str = "CropCare";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// The device-level primitive reminders are handed to. Requests are
/// independent; there is no cancellation.
pub trait NotificationScheduler {
    fn request_permissions(&self) -> Result<PermissionStatus, AppError>;
    fn schedule(&self, request: &NotificationRequest) -> Result<(), AppError>;
}

/// Shows a reminder on the desktop right now.
pub trait Notifier {
    fn notify(&self, reminder: &Reminder) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _reminder: &Reminder) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifications_disabled() -> bool {
    std::env::var("CROPCARE_DISABLE_NOTIFICATIONS").is_ok()
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if notifications_disabled() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(err) => match err {
            AppError::InvalidData(_) => Ok(Box::new(NoopNotifier)),
            other => Err(other),
        },
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
