use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_AUTO_SYNC_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_STORAGE_CAPACITY: u64 = 5 * 1024 * 1024;
pub const DEFAULT_RECENT_PROJECTS_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default = "default_recent_projects_limit")]
    pub recent_projects_limit: usize,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_true")]
    pub auto_sync: bool,
    #[serde(default = "default_auto_sync_interval")]
    pub auto_sync_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_storage_capacity")]
    pub capacity_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `codecanvas=debug`. `RUST_LOG` wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_auto_sync_interval() -> u64 {
    DEFAULT_AUTO_SYNC_INTERVAL_SECS
}

fn default_storage_capacity() -> u64 {
    DEFAULT_STORAGE_CAPACITY
}

fn default_recent_projects_limit() -> usize {
    DEFAULT_RECENT_PROJECTS_LIMIT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sync: SyncSettings::default(),
            storage: StorageSettings::default(),
            recent_projects_limit: DEFAULT_RECENT_PROJECTS_LIMIT,
            log: LogSettings::default(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            auto_sync: true,
            auto_sync_interval_secs: DEFAULT_AUTO_SYNC_INTERVAL_SECS,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_STORAGE_CAPACITY,
            data_dir: None,
        }
    }
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/settings.rs"]
mod tests;
