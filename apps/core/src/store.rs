use serde::{Deserialize, Serialize};

use crate::collection::{BoundedOrderedCollection, Capacity};
use crate::model::{now_epoch_secs, Entry};

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;
pub const STATE_VERSION: u32 = 1;

/// Owned, immutable copy of everything the store persists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_pinned_capacity")]
    pub pinned_capacity: Capacity,
    #[serde(default)]
    pub history: Vec<Entry>,
    #[serde(default)]
    pub pinned: Vec<Entry>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl StoreState {
    pub fn with_history_capacity(history_capacity: usize) -> Self {
        Self {
            version: STATE_VERSION,
            history_capacity,
            pinned_capacity: Capacity::Unbounded,
            history: Vec::new(),
            pinned: Vec::new(),
        }
    }
}

fn default_version() -> u32 {
    STATE_VERSION
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_pinned_capacity() -> Capacity {
    Capacity::Unbounded
}

/// How soon a change should reach durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Soon,
}

/// Receives a snapshot after every mutation that changed persisted state.
pub trait ActivityListener: Send {
    fn on_activity(&self, state: StoreState, urgency: Urgency);
}

impl<F> ActivityListener for F
where
    F: Fn(StoreState, Urgency) + Send,
{
    fn on_activity(&self, state: StoreState, urgency: Urgency) {
        self(state, urgency)
    }
}

/// Answers whether an id still resolves to a live resource. Supplied by the
/// caller; the store never resolves ids itself.
pub trait ResourceProbe {
    fn exists(&self, id: &str) -> bool;
}

impl<F> ResourceProbe for F
where
    F: Fn(&str) -> bool,
{
    fn exists(&self, id: &str) -> bool {
        self(id)
    }
}

pub struct SelectionStore {
    history: BoundedOrderedCollection,
    pinned: BoundedOrderedCollection,
    listener: Option<Box<dyn ActivityListener>>,
}

impl std::fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionStore")
            .field("history", &self.history)
            .field("pinned", &self.pinned)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SelectionStore {
    pub fn builder() -> SelectionStoreBuilder {
        SelectionStoreBuilder::default()
    }

    pub fn from_state(state: StoreState) -> Self {
        Self::builder().state(state).build()
    }

    pub fn history(&self) -> &BoundedOrderedCollection {
        &self.history
    }

    pub fn pinned(&self) -> &BoundedOrderedCollection {
        &self.pinned
    }

    pub fn history_capacity(&self) -> usize {
        self.history.capacity().limit().unwrap_or(usize::MAX)
    }

    pub fn snapshot(&self) -> StoreState {
        StoreState {
            version: STATE_VERSION,
            history_capacity: self.history_capacity(),
            pinned_capacity: self.pinned.capacity(),
            history: self.history.entries().to_vec(),
            pinned: self.pinned.entries().to_vec(),
        }
    }

    /// Records `id` as the most recent selection. A re-selection never moves
    /// `last_selected_at` backwards and clears the missing flag.
    pub fn record_selection(&mut self, id: &str, display_name: &str, timestamp: i64) {
        let last_selected_at = self
            .history
            .get(id)
            .map_or(timestamp, |existing| existing.last_selected_at.max(timestamp));
        let entry = Entry::new(id, display_name, last_selected_at);
        log::debug!("recording selection {entry}");
        self.history.upsert_front(entry);
        self.notify(Urgency::Normal);
    }

    pub fn record_selection_now(&mut self, id: &str, display_name: &str) {
        self.record_selection(id, display_name, now_epoch_secs());
    }

    /// Copies an entry already known to history (preferred) or pinned to the
    /// front of pinned. Unknown ids leave the store untouched.
    pub fn pin(&mut self, id: &str) -> bool {
        let Some(entry) = self.history.get(id).or_else(|| self.pinned.get(id)).cloned() else {
            log::debug!("pin ignored for unknown id {id}");
            return false;
        };
        self.pinned.upsert_front(entry);
        self.notify(Urgency::Normal);
        true
    }

    pub fn unpin(&mut self, id: &str) -> bool {
        let removed = self.pinned.remove_by_id(id);
        if removed {
            self.notify(Urgency::Normal);
        }
        removed
    }

    /// Flags matching entries as missing without removing them. Returns
    /// whether any matching entry was found.
    pub fn mark_missing(&mut self, id: &str, in_history: bool, in_pinned: bool) -> bool {
        let (found, changed) = self.set_missing_flag(id, in_history, in_pinned);
        if changed {
            self.notify(Urgency::Normal);
        }
        found
    }

    /// Asks `probe` about every tracked id and marks the unresolved ones as
    /// missing in both collections. Returns the ids newly marked.
    pub fn scan_missing(&mut self, probe: &dyn ResourceProbe) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for entry in self.history.iter().chain(self.pinned.iter()) {
            if !ids.contains(&entry.id) {
                ids.push(entry.id.clone());
            }
        }

        let mut newly_missing = Vec::new();
        for id in ids {
            if probe.exists(&id) {
                continue;
            }
            let (_, changed) = self.set_missing_flag(&id, true, true);
            if changed {
                newly_missing.push(id);
            }
        }

        if !newly_missing.is_empty() {
            log::info!("marked {} stale selection(s) as missing", newly_missing.len());
            self.notify(Urgency::Normal);
        }
        newly_missing
    }

    pub fn remove_missing(&mut self, id: &str) -> bool {
        let from_history = self.history.remove_by_id(id);
        let from_pinned = self.pinned.remove_by_id(id);
        let removed = from_history || from_pinned;
        if removed {
            self.notify(Urgency::Normal);
        }
        removed
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.notify(Urgency::Normal);
    }

    /// The new bound applies on the next recorded selection.
    pub fn set_history_capacity(&mut self, capacity: usize) {
        self.history.set_capacity(Capacity::Bounded(capacity));
        self.notify(Urgency::Soon);
    }

    pub fn set_pinned_capacity(&mut self, capacity: Capacity) {
        self.pinned.set_capacity(capacity);
        self.notify(Urgency::Soon);
    }

    fn set_missing_flag(&mut self, id: &str, in_history: bool, in_pinned: bool) -> (bool, bool) {
        let mut found = false;
        let mut changed = false;
        let targets = [(in_history, &mut self.history), (in_pinned, &mut self.pinned)];
        for (selected, collection) in targets {
            if !selected {
                continue;
            }
            if let Some(entry) = collection.get_mut(id) {
                found = true;
                changed |= !entry.is_missing;
                entry.is_missing = true;
            }
        }
        (found, changed)
    }

    fn notify(&self, urgency: Urgency) {
        if let Some(listener) = &self.listener {
            listener.on_activity(self.snapshot(), urgency);
        }
    }
}

pub struct SelectionStoreBuilder {
    history_capacity: usize,
    pinned_capacity: Capacity,
    state: Option<StoreState>,
    listener: Option<Box<dyn ActivityListener>>,
}

impl Default for SelectionStoreBuilder {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            pinned_capacity: Capacity::Unbounded,
            state: None,
            listener: None,
        }
    }
}

impl SelectionStoreBuilder {
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn pinned_capacity(mut self, capacity: Capacity) -> Self {
        self.pinned_capacity = capacity;
        self
    }

    /// Restores persisted state; its capacities win over the builder's.
    pub fn state(mut self, state: StoreState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn on_activity(mut self, listener: impl ActivityListener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn build(self) -> SelectionStore {
        let (history, pinned) = match self.state {
            Some(state) => (
                BoundedOrderedCollection::from_entries(
                    Capacity::Bounded(state.history_capacity),
                    state.history,
                ),
                BoundedOrderedCollection::from_entries(state.pinned_capacity, state.pinned),
            ),
            None => (
                BoundedOrderedCollection::bounded(self.history_capacity),
                BoundedOrderedCollection::new(self.pinned_capacity),
            ),
        };
        SelectionStore {
            history,
            pinned,
            listener: self.listener,
        }
    }
}
