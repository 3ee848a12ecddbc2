use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::codec::{self, CodecError};
use crate::collection::Capacity;
use crate::store::{StoreState, DEFAULT_HISTORY_CAPACITY};

pub const DATA_FILE_NAME: &str = "selection-history.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl StorageError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Flat-file home of one namespace's selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStorage {
    path: PathBuf,
    default_history_capacity: usize,
    default_pinned_capacity: Capacity,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_history_capacity: DEFAULT_HISTORY_CAPACITY,
            default_pinned_capacity: Capacity::Unbounded,
        }
    }

    /// `<data_dir>/<namespace>/selection-history.json`
    pub fn for_namespace(data_dir: &Path, namespace: &str) -> Self {
        Self::new(
            data_dir
                .join(sanitize_namespace(namespace))
                .join(DATA_FILE_NAME),
        )
    }

    /// Capacities used when a fresh state has to be created.
    pub fn with_default_capacities(mut self, history: usize, pinned: Capacity) -> Self {
        self.default_history_capacity = history;
        self.default_pinned_capacity = pinned;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_state(&self) -> StoreState {
        let mut state = StoreState::with_history_capacity(self.default_history_capacity);
        state.pinned_capacity = self.default_pinned_capacity;
        state
    }

    /// Reads the persisted state. A missing file is created with a default
    /// state; an empty or corrupt file yields a default state and is left
    /// alone until the next save.
    pub fn load(&self) -> Result<StoreState, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                let state = self.default_state();
                self.save(&state)?;
                log::info!("created selection state at {}", self.path.display());
                return Ok(state);
            }
            Err(error) => return Err(StorageError::io("read", &self.path, error)),
        };

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(self.default_state());
        }

        match codec::deserialize(&bytes) {
            Ok(state) => Ok(state),
            Err(error) => {
                log::warn!(
                    "ignoring unreadable selection state at {}: {error}",
                    self.path.display()
                );
                Ok(self.default_state())
            }
        }
    }

    /// Writes through a sibling temp file and renames it into place so a
    /// reader never sees a partial file.
    pub fn save(&self, state: &StoreState) -> Result<(), StorageError> {
        let encoded = codec::serialize(state)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::io("create directory for", &self.path, e))?;
        }

        let tmp_path = self.tmp_path();
        let mut file = fs::File::create(&tmp_path)
            .map_err(|e| StorageError::io("create", &tmp_path, e))?;
        file.write_all(&encoded)
            .and_then(|()| file.sync_all())
            .map_err(|e| StorageError::io("write", &tmp_path, e))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StorageError::io("replace", &self.path, e)
        })
    }

    /// Truncates the persisted file; the next load starts from defaults.
    pub fn clear(&self) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map(|_| ())
            .map_err(|e| StorageError::io("truncate", &self.path, e))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DATA_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Maps a project name to a single safe directory component.
pub fn sanitize_namespace(namespace: &str) -> String {
    let cleaned: String = namespace
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "default".to_string()
    } else {
        cleaned
    }
}
