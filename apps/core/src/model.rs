use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One recorded selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub display_name: String,
    pub last_selected_at: i64,
    #[serde(default)]
    pub is_missing: bool,
}

impl Entry {
    pub fn new(id: &str, display_name: &str, last_selected_at: i64) -> Self {
        Self::from_owned(id.to_string(), display_name.to_string(), last_selected_at)
    }

    pub fn from_owned(id: String, display_name: String, last_selected_at: i64) -> Self {
        Self {
            id,
            display_name,
            last_selected_at,
            is_missing: false,
        }
    }

    pub fn with_missing(mut self, is_missing: bool) -> Self {
        self.is_missing = is_missing;
        self
    }

    /// Lowercased name used by the name column sort.
    pub fn sort_name(&self) -> String {
        self.display_name.to_lowercase()
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "name: {} id: {}", self.display_name, self.id)
    }
}

pub fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::Entry;

    #[test]
    fn new_entry_is_not_missing() {
        let entry = Entry::new("guid-1", "Player.prefab", 1_700_000_000);
        assert!(!entry.is_missing);
        assert!(entry.with_missing(true).is_missing);
    }

    #[test]
    fn missing_flag_defaults_when_absent_from_json() {
        let raw = r#"{"id":"a","display_name":"A","last_selected_at":5}"#;
        let entry: Entry = serde_json::from_str(raw).unwrap();
        assert!(!entry.is_missing);
        assert_eq!(entry.last_selected_at, 5);
    }
}
