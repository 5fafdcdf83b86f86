use crate::error::AppError;
use serde::Serialize;

pub const USER_ENV_VAR: &str = "CROPCARE_USER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub trait IdentityProvider {
    fn current_user(&self) -> Option<User>;
}

/// Signed-in user picked from, in order: an explicit id, `CROPCARE_USER`,
/// then the configured id.
#[derive(Debug, Clone, Default)]
pub struct ResolvedIdentity {
    pub explicit: Option<String>,
    pub configured: Option<String>,
}

impl ResolvedIdentity {
    pub fn new(explicit: Option<String>, configured: Option<String>) -> Self {
        Self {
            explicit,
            configured,
        }
    }
}

impl IdentityProvider for ResolvedIdentity {
    fn current_user(&self) -> Option<User> {
        let from_env = std::env::var(USER_ENV_VAR).ok();
        first_present([
            self.explicit.as_deref(),
            from_env.as_deref(),
            self.configured.as_deref(),
        ])
        .map(|id| User { id, email: None })
    }
}

pub fn require_user(provider: &dyn IdentityProvider) -> Result<User, AppError> {
    provider
        .current_user()
        .ok_or_else(|| AppError::invalid_input("sign in required"))
}

fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
