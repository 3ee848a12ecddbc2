use crate::collection::BoundedOrderedCollection;
use crate::model::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Missing,
    Time,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::Name, SortKey::Missing, SortKey::Time];

    fn index(self) -> usize {
        match self {
            Self::Name => 0,
            Self::Missing => 1,
            Self::Time => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
    Inactive,
}

/// Three-way toggle per column; at most one column is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSort {
    directions: [SortDirection; 3],
}

impl Default for ColumnSort {
    fn default() -> Self {
        Self {
            directions: [SortDirection::Inactive; 3],
        }
    }
}

impl ColumnSort {
    pub fn direction(&self, key: SortKey) -> SortDirection {
        self.directions[key.index()]
    }

    /// Ascending unless the column was already ascending; resets the others.
    pub fn activate(&mut self, key: SortKey) -> SortDirection {
        let next = match self.direction(key) {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending | SortDirection::Inactive => SortDirection::Ascending,
        };
        self.directions = [SortDirection::Inactive; 3];
        self.directions[key.index()] = next;
        next
    }

    pub fn active(&self) -> Option<(SortKey, SortDirection)> {
        SortKey::ALL
            .into_iter()
            .map(|key| (key, self.direction(key)))
            .find(|(_, direction)| *direction != SortDirection::Inactive)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Entries in display order. With no active column this is recency order.
    pub fn apply<'a>(&self, collection: &'a BoundedOrderedCollection) -> Vec<&'a Entry> {
        let Some((key, direction)) = self.active() else {
            return collection.iter().collect();
        };
        let ascending = direction == SortDirection::Ascending;
        match key {
            SortKey::Name => collection.reorder_by(Entry::sort_name, ascending),
            SortKey::Missing => collection.reorder_by(|entry| entry.is_missing, ascending),
            SortKey::Time => collection.reorder_by(|entry| entry.last_selected_at, ascending),
        }
    }
}
