//! Byte encoding of [`StoreState`].
//!
//! Output is pretty-printed JSON with a fixed field order (the declaration
//! order of `StoreState` and `Entry`). Input is strict JSON first; a file that
//! fails strict parsing is retried as JSON5 so hand-edited files with comments
//! or trailing commas still load.

use crate::store::{StoreState, STATE_VERSION};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to parse selection state: {0}")]
    Parse(String),
    #[error("unsupported selection state version {found} (max {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("failed to encode selection state: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn serialize(state: &StoreState) -> Result<Vec<u8>, CodecError> {
    let mut bytes = serde_json::to_vec_pretty(state)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn deserialize(bytes: &[u8]) -> Result<StoreState, CodecError> {
    let state = match serde_json::from_slice::<StoreState>(bytes) {
        Ok(state) => state,
        Err(strict_error) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| CodecError::Parse(format!("invalid utf-8: {e}")))?;
            json5::from_str::<StoreState>(text)
                .map_err(|_| CodecError::Parse(strict_error.to_string()))?
        }
    };

    if state.version > STATE_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: state.version,
            supported: STATE_VERSION,
        });
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::{deserialize, serialize, CodecError};
    use crate::collection::Capacity;
    use crate::model::Entry;
    use crate::store::StoreState;

    fn sample() -> StoreState {
        let mut state = StoreState::with_history_capacity(3);
        state.history = vec![
            Entry::new("b", "B \"quoted\"\n", 20),
            Entry::new("a", "Ä", 10).with_missing(true),
        ];
        state.pinned = vec![Entry::new("a", "Ä", 10)];
        state.pinned_capacity = Capacity::Bounded(8);
        state
    }

    #[test]
    fn serialized_field_order_is_stable() {
        let text = String::from_utf8(serialize(&sample()).unwrap()).unwrap();
        let version = text.find("\"version\"").unwrap();
        let capacity = text.find("\"history_capacity\"").unwrap();
        let pinned_capacity = text.find("\"pinned_capacity\"").unwrap();
        let history = text.find("\"history\":").unwrap();
        let pinned = text.find("\"pinned\":").unwrap();
        assert!(version < capacity && capacity < pinned_capacity);
        assert!(pinned_capacity < history && history < pinned);
        assert!(text.contains("\\\"quoted\\\"\\n"));
        assert!(text.contains("\"last_selected_at\": 20"));
    }

    #[test]
    fn round_trip_preserves_state() {
        let state = sample();
        let decoded = deserialize(&serialize(&state).unwrap()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        assert!(matches!(deserialize(b"{not-json"), Err(CodecError::Parse(_))));
        assert!(matches!(deserialize(b""), Err(CodecError::Parse(_))));
        assert!(matches!(deserialize(&[0xff, 0xfe]), Err(CodecError::Parse(_))));
    }

    #[test]
    fn future_version_is_rejected() {
        let raw = br#"{"version": 99, "history_capacity": 5, "history": [], "pinned": []}"#;
        assert!(matches!(
            deserialize(raw),
            Err(CodecError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn hand_edited_json5_is_accepted() {
        let raw = br#"{
            // trimmed by hand
            history_capacity: 4,
            history: [
                { id: "x", display_name: "X", last_selected_at: 7, },
            ],
        }"#;
        let state = deserialize(raw).unwrap();
        assert_eq!(state.history_capacity, 4);
        assert_eq!(state.history[0].id, "x");
        assert_eq!(state.pinned_capacity, Capacity::Unbounded);
        assert!(state.pinned.is_empty());
    }
}
