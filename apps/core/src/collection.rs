//! Recency-ordered, id-unique, capacity-bounded list of entries.
//!
//! Index 0 is always the most recently touched entry. Capacity is a soft
//! ceiling: it is enforced when an upsert grows the list, never on reads and
//! never at the moment the capacity is changed.

use serde::{Deserialize, Serialize};

use crate::model::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<usize>", into = "Option<usize>")]
pub enum Capacity {
    Bounded(usize),
    Unbounded,
}

impl Capacity {
    pub fn limit(self) -> Option<usize> {
        match self {
            Self::Bounded(limit) => Some(limit),
            Self::Unbounded => None,
        }
    }

    pub fn allows(self, len: usize) -> bool {
        self.limit().map_or(true, |limit| len <= limit)
    }
}

impl From<Option<usize>> for Capacity {
    fn from(value: Option<usize>) -> Self {
        value.map_or(Self::Unbounded, Self::Bounded)
    }
}

impl From<Capacity> for Option<usize> {
    fn from(value: Capacity) -> Self {
        value.limit()
    }
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bounded(limit) => write!(f, "{limit}"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedOrderedCollection {
    capacity: Capacity,
    items: Vec<Entry>,
}

impl BoundedOrderedCollection {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            capacity,
            items: Vec::new(),
        }
    }

    pub fn bounded(limit: usize) -> Self {
        Self::new(Capacity::Bounded(limit))
    }

    pub fn unbounded() -> Self {
        Self::new(Capacity::Unbounded)
    }

    /// Rebuilds a collection from persisted items. Later duplicates of an id
    /// are dropped; the list is not trimmed to capacity until the next upsert.
    pub fn from_entries(capacity: Capacity, entries: Vec<Entry>) -> Self {
        let mut items: Vec<Entry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if items.iter().all(|existing| existing.id != entry.id) {
                items.push(entry);
            }
        }
        Self { capacity, items }
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Takes effect on the next [`upsert_front`](Self::upsert_front).
    pub fn set_capacity(&mut self, capacity: Capacity) {
        self.capacity = capacity;
    }

    /// Moves `entry` to the front, replacing any entry with the same id, then
    /// trims the tail down to capacity. With a capacity of 0 the collection
    /// ends up empty.
    pub fn upsert_front(&mut self, entry: Entry) {
        if let Some(index) = self.position(&entry.id) {
            self.items.remove(index);
        }
        self.items.insert(0, entry);
        if let Some(limit) = self.capacity.limit() {
            self.items.truncate(limit);
        }
    }

    pub fn remove_by_id(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Orders entries by `key` without disturbing recency order. Equal keys
    /// keep their recency order in both directions.
    pub fn reorder_by<K, F>(&self, mut key: F, ascending: bool) -> Vec<&Entry>
    where
        K: Ord,
        F: FnMut(&Entry) -> K,
    {
        let mut keyed: Vec<(K, &Entry)> =
            self.items.iter().map(|entry| (key(entry), entry)).collect();
        if ascending {
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
        } else {
            keyed.sort_by(|a, b| b.0.cmp(&a.0));
        }
        keyed.into_iter().map(|(_, entry)| entry).collect()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|entry| entry.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.items.iter().find(|entry| entry.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Entry> {
        self.items.iter_mut().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn first(&self) -> Option<&Entry> {
        self.items.first()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|entry| entry.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a> IntoIterator for &'a BoundedOrderedCollection {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
