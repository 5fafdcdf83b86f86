use crate::error::AppError;
use crate::model::Locale;
use crate::projection::DEFAULT_DUE_SOON_DAYS;
use crate::reminder_scheduler::DEFAULT_WEEKLY_WEEKS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "CROPCARE_CONFIG_PATH";
pub const MAX_WEEKLY_REMINDER_WEEKS: u32 = 52;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub locale: Locale,
    pub user_id: Option<String>,
    pub weekly_reminder_weeks: u32,
    pub due_soon_days: i64,
    pub notifications: bool,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            user_id: None,
            weekly_reminder_weeks: DEFAULT_WEEKLY_WEEKS,
            due_soon_days: DEFAULT_DUE_SOON_DAYS,
            notifications: true,
            log_level: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub locale: Option<Locale>,
    pub user_id: Option<String>,
    pub weekly_reminder_weeks: Option<u32>,
    pub due_soon_days: Option<i64>,
    pub notifications: Option<bool>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Applies one `KEY=VALUE` pair. Keys are matched after canonicalizing,
    /// so `Due-Soon-Days` and `due_soon_days` are the same key.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        let value = value.trim();
        match canonical_key(key).as_str() {
            "locale" => {
                let locale = Locale::parse(value)
                    .ok_or_else(|| AppError::invalid_input(format!("unknown locale: {value}")))?;
                self.locale = Some(locale);
            }
            "user_id" | "user" => self.user_id = Some(value.to_string()),
            "weekly_reminder_weeks" | "weeks" => {
                let weeks: u32 = parse_number(key, value)?;
                if weeks > MAX_WEEKLY_REMINDER_WEEKS {
                    return Err(AppError::invalid_input(format!(
                        "{key} must be at most {MAX_WEEKLY_REMINDER_WEEKS}"
                    )));
                }
                self.weekly_reminder_weeks = Some(weeks);
            }
            "due_soon_days" => {
                let days: u32 = parse_number(key, value)?;
                self.due_soon_days = Some(i64::from(days));
            }
            "notifications" => {
                let enabled = match value.to_ascii_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    _ => {
                        return Err(AppError::invalid_input(format!(
                            "notifications must be true or false, got {value}"
                        )));
                    }
                };
                self.notifications = Some(enabled);
            }
            "log_level" | "log" => self.log_level = Some(value.to_string()),
            _ => return Err(AppError::invalid_input(format!("unknown config key: {key}"))),
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value
        .parse()
        .map_err(|_| AppError::invalid_input(format!("{key} must be a non-negative number")))
}

pub fn canonical_key(raw: &str) -> String {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    cleaned.trim_matches('_').to_string()
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("cropcare")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cropcare")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_config(config))
}

fn normalize_config(mut config: Config) -> Config {
    config.user_id = config
        .user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    config.weekly_reminder_weeks = config.weekly_reminder_weeks.min(MAX_WEEKLY_REMINDER_WEEKS);
    config.due_soon_days = config.due_soon_days.max(0);
    config
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(locale) = overrides.locale {
        merged.locale = locale;
    }
    if let Some(user_id) = overrides.user_id.as_ref() {
        merged.user_id = Some(user_id.clone()).filter(|id| !id.is_empty());
    }
    if let Some(weeks) = overrides.weekly_reminder_weeks {
        merged.weekly_reminder_weeks = weeks;
    }
    if let Some(days) = overrides.due_soon_days {
        merged.due_soon_days = days;
    }
    if let Some(enabled) = overrides.notifications {
        merged.notifications = enabled;
    }
    if let Some(level) = overrides.log_level.as_ref() {
        merged.log_level = Some(level.clone());
    }

    merged
}
