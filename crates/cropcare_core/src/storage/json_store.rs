use crate::error::AppError;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "local.json";
const REMOTE_FILE_NAME: &str = "remote.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredItems {
    schema_version: u32,
    #[serde(default)]
    items: BTreeMap<String, String>,
}

pub fn store_path() -> Result<PathBuf, AppError> {
    path_from_env("CROPCARE_STORE_PATH", STORE_FILE_NAME)
}

/// File standing in for the hosted document database.
pub fn remote_path() -> Result<PathBuf, AppError> {
    path_from_env("CROPCARE_REMOTE_PATH", REMOTE_FILE_NAME)
}

fn path_from_env(var: &str, file_name: &str) -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(var)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("cropcare").join(file_name))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cropcare")
            .join(file_name))
    }
}

pub fn load_items(path: &Path) -> Result<BTreeMap<String, String>, AppError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredItems = serde_json::from_str(&content)?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    Ok(stored.items)
}

pub fn save_items(path: &Path, items: &BTreeMap<String, String>) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredItems {
        schema_version: SCHEMA_VERSION,
        items: items.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}

/// Key-value store persisted as a single JSON file. Every call re-reads the
/// file, so two processes sharing a path see each other's writes.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(load_items(&self.path)?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut items = load_items(&self.path)?;
        items.insert(key.to_string(), value.to_string());
        save_items(&self.path, &items)
    }

    fn remove_item(&self, key: &str) -> Result<(), AppError> {
        let mut items = load_items(&self.path)?;
        if items.remove(key).is_some() {
            save_items(&self.path, &items)?;
        }
        Ok(())
    }
}
