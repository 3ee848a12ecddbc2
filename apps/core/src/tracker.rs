use std::path::Path;

use crate::config::{self, ConfigError, TrackerConfig};
use crate::persister::{DebounceWindows, DebouncedPersister};
use crate::storage::{FileStorage, StorageError};
use crate::store::{SelectionStore, StoreState};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// One session's store wired to debounced persistence. Dropping the tracker
/// flushes whatever has not been written successfully yet.
pub struct SelectionTracker {
    store: SelectionStore,
    persister: DebouncedPersister,
    storage: FileStorage,
}

impl SelectionTracker {
    /// Loads the namespace's persisted state. An unreadable file never
    /// prevents opening: the session starts from a default store instead.
    pub fn open(config: &TrackerConfig) -> Result<Self, TrackerError> {
        config::validate(config)?;
        let storage = config.storage();
        let state = match storage.load() {
            Ok(state) => state,
            Err(error) => {
                log::warn!("starting with an empty selection store: {error}");
                storage.default_state()
            }
        };
        log::info!(
            "opened selection tracker namespace={} path={} history={} pinned={}",
            config.namespace,
            storage.path().display(),
            state.history.len(),
            state.pinned.len(),
        );
        Ok(Self::with_state(storage, state, config.debounce_windows()))
    }

    pub fn with_state(storage: FileStorage, state: StoreState, windows: DebounceWindows) -> Self {
        let persister = DebouncedPersister::new(storage.clone(), windows);
        let store = SelectionStore::builder()
            .state(state)
            .on_activity(persister.handle())
            .build();
        Self {
            store,
            persister,
            storage,
        }
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    /// Mutations made through this reference arm the debounced write.
    pub fn store_mut(&mut self) -> &mut SelectionStore {
        &mut self.store
    }

    pub fn persister(&self) -> &DebouncedPersister {
        &self.persister
    }

    pub fn storage_path(&self) -> &Path {
        self.storage.path()
    }

    /// Writes the current state now, superseding any pending write.
    pub fn flush_now(&self) -> Result<(), TrackerError> {
        self.persister.flush_now(&self.store.snapshot())?;
        Ok(())
    }

    /// Truncates the persisted file and starts over from a default store.
    pub fn reset(&mut self) -> Result<(), TrackerError> {
        let storage = &self.storage;
        self.persister.clear_with(|| storage.clear())?;
        self.store = SelectionStore::builder()
            .state(self.storage.default_state())
            .on_activity(self.persister.handle())
            .build();
        log::info!("cleared selection data at {}", self.storage.path().display());
        Ok(())
    }

    /// Failure of the last background write, if any, for display as a warning.
    pub fn take_persist_warning(&self) -> Option<StorageError> {
        self.persister.take_last_error()
    }
}

impl Drop for SelectionTracker {
    fn drop(&mut self) {
        if !self.persister.is_dirty() {
            return;
        }
        if let Err(error) = self.flush_now() {
            log::warn!("failed to save selection state on teardown: {error}");
        }
    }
}
