use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::persister::DebounceWindows;
use crate::storage::FileStorage;
use crate::store::DEFAULT_HISTORY_CAPACITY;

pub const APP_DIR_NAME: &str = "selection-tracker";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const MAX_CAPACITY: usize = 10_000;
pub const MAX_WINDOW_SECS: u64 = 86_400;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub data_dir: PathBuf,
    pub namespace: String,
    pub history_capacity: usize,
    pub pinned_capacity: Option<usize>,
    pub quiet_window_secs: u64,
    pub soon_window_secs: u64,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let base = stable_app_data_dir();
        Self {
            config_path: base.join(CONFIG_FILE_NAME),
            data_dir: base,
            namespace: "default".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            pinned_capacity: None,
            quiet_window_secs: 10,
            soon_window_secs: 1,
        }
    }
}

impl TrackerConfig {
    pub fn debounce_windows(&self) -> DebounceWindows {
        DebounceWindows {
            quiet: Duration::from_secs(self.quiet_window_secs),
            soon: Duration::from_secs(self.soon_window_secs),
        }
    }

    pub fn storage(&self) -> FileStorage {
        FileStorage::for_namespace(&self.data_dir, &self.namespace)
            .with_default_capacities(self.history_capacity, self.pinned_capacity.into())
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Per-user data directory, falling back to the temp dir when the platform
/// reports none.
pub fn stable_app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

/// Loads `path` (or the default config location). A missing file yields the
/// defaults; the result is validated either way.
pub fn load(path: Option<&Path>) -> Result<TrackerConfig, ConfigError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| stable_app_data_dir().join(CONFIG_FILE_NAME));

    let mut cfg = match std::fs::read_to_string(&config_path) {
        Ok(raw) => toml::from_str::<TrackerConfig>(&raw)?,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => TrackerConfig::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: config_path,
                source,
            })
        }
    };
    cfg.config_path = config_path;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn save(cfg: &TrackerConfig) -> Result<(), ConfigError> {
    validate(cfg)?;
    let encoded = toml::to_string_pretty(cfg)?;
    let io_error = |source| ConfigError::Io {
        path: cfg.config_path.clone(),
        source,
    };
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(&cfg.config_path, encoded).map_err(io_error)
}

pub fn validate(cfg: &TrackerConfig) -> Result<(), ConfigError> {
    if cfg.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("data_dir is required".into()));
    }

    if cfg.namespace.trim().is_empty() {
        return Err(ConfigError::Invalid("namespace is required".into()));
    }

    if cfg.history_capacity > MAX_CAPACITY {
        return Err(ConfigError::Invalid(format!(
            "history_capacity must be at most {MAX_CAPACITY}"
        )));
    }

    if cfg.pinned_capacity.is_some_and(|capacity| capacity > MAX_CAPACITY) {
        return Err(ConfigError::Invalid(format!(
            "pinned_capacity must be at most {MAX_CAPACITY}"
        )));
    }

    if cfg.quiet_window_secs == 0 || cfg.soon_window_secs == 0 {
        return Err(ConfigError::Invalid(
            "debounce windows must be at least 1 second".into(),
        ));
    }

    if cfg.quiet_window_secs > MAX_WINDOW_SECS {
        return Err(ConfigError::Invalid(format!(
            "quiet_window_secs must be at most {MAX_WINDOW_SECS}"
        )));
    }

    if cfg.soon_window_secs > cfg.quiet_window_secs {
        return Err(ConfigError::Invalid(
            "soon_window_secs must not exceed quiet_window_secs".into(),
        ));
    }

    Ok(())
}
