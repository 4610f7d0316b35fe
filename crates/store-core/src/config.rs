//! Store tuning knobs, persisted as `config.json` in the data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::models::{DEFAULT_CACHE_MAX_AGE_MS, DEFAULT_NOTIFICATION_DURATION_MS, SESSION_TIMEOUT_MS};

/// Default capacity of the observer broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Runtime configuration consumed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Inactivity window after which a session is invalid.
    pub session_timeout_ms: i64,
    /// Lifetime given to notifications without an explicit duration.
    pub default_notification_duration_ms: i64,
    /// Max age used by staleness checks that do not pass one.
    pub default_cache_max_age_ms: i64,
    /// Buffered state changes per observer before old ones are dropped.
    pub event_capacity: usize,
    /// Initial value of the dark-mode flag.
    pub dark_mode: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: SESSION_TIMEOUT_MS,
            default_notification_duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
            default_cache_max_age_ms: DEFAULT_CACHE_MAX_AGE_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            dark_mode: false,
        }
    }
}

impl StoreConfig {
    /// Config path rooted at `data_dir`.
    pub fn config_path_in(data_dir: &Path) -> PathBuf {
        data_dir.join("config.json")
    }

    /// Load the config from `path`.
    /// Returns `Default` when the file is absent, unparseable or invalid.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        let config: Self = match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "failed to parse store config; using defaults"
                );
                return Self::default();
            }
        };
        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "invalid store config; using defaults");
                Self::default()
            }
        }
    }

    /// Atomically write the config to `path`, creating parent directories
    /// if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Reject values the store cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.session_timeout_ms <= 0 {
            return Err(StoreError::Config(
                "session_timeout_ms must be positive".to_string(),
            ));
        }
        if self.default_cache_max_age_ms < 0 {
            return Err(StoreError::Config(
                "default_cache_max_age_ms must not be negative".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(StoreError::Config(
                "event_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
