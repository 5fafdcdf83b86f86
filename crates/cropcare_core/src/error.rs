use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    #[error("io_error - {0}")]
    Io(String),
    #[error("permission_denied - {0}")]
    PermissionDenied(String),
    #[error("remote_error - {0}")]
    Remote(String),
    #[error("subscription_error - {0}")]
    Subscription(String),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn permission_denied<M: Into<String>>(message: M) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub fn remote<M: Into<String>>(message: M) -> Self {
        Self::Remote(message.into())
    }

    pub fn subscription<M: Into<String>>(message: M) -> Self {
        Self::Subscription(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Remote(_) => "remote_error",
            Self::Subscription(_) => "subscription_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(message)
            | Self::InvalidData(message)
            | Self::Io(message)
            | Self::PermissionDenied(message)
            | Self::Remote(message)
            | Self::Subscription(message) => message,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_data(err.to_string())
    }
}
