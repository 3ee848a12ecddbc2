use std::sync::{Arc, Mutex};

use seltrack_core::collection::Capacity;
use seltrack_core::store::{SelectionStore, StoreState, Urgency};

fn ids(store: &SelectionStore) -> (Vec<&str>, Vec<&str>) {
    (store.history().ids(), store.pinned().ids())
}

#[test]
fn capacity_three_walkthrough() {
    let mut store = SelectionStore::builder().history_capacity(3).build();
    for (at, id) in ["A", "B", "C", "D"].iter().enumerate() {
        store.record_selection(id, &format!("{id}.asset"), at as i64);
    }
    assert_eq!(ids(&store).0, vec!["D", "C", "B"]);

    store.record_selection("B", "B.asset", 10);
    assert_eq!(ids(&store).0, vec!["B", "D", "C"]);

    assert!(store.pin("D"));
    assert_eq!(ids(&store), (vec!["B", "D", "C"], vec!["D"]));

    assert!(store.remove_missing("D"));
    assert_eq!(ids(&store), (vec!["B", "C"], vec![]));
}

#[test]
fn reselection_moves_to_front_and_updates_timestamp() {
    let mut store = SelectionStore::default();
    store.record_selection("a", "A", 100);
    store.record_selection("b", "B", 200);
    store.record_selection("c", "C", 300);
    let before = store.history().len();

    store.record_selection("a", "A", 400);

    assert_eq!(store.history().len(), before);
    assert_eq!(store.history().first().map(|e| e.id.as_str()), Some("a"));
    assert_eq!(store.history().get("a").unwrap().last_selected_at, 400);
}

#[test]
fn pin_then_unpin_restores_pinned_and_never_touches_history() {
    let mut store = SelectionStore::default();
    store.record_selection("a", "A", 1);
    store.record_selection("b", "B", 2);
    store.pin("a");
    let history_before = store.history().clone();
    let pinned_before = store.pinned().clone();

    assert!(store.pin("b"));
    assert_eq!(store.history(), &history_before);
    assert!(store.unpin("b"));

    assert_eq!(store.history(), &history_before);
    assert_eq!(store.pinned(), &pinned_before);
}

#[test]
fn pin_preserves_last_selected_at() {
    let mut store = SelectionStore::default();
    store.record_selection("a", "A", 1_700_000_123);
    store.pin("a");
    assert_eq!(store.pinned().get("a").unwrap().last_selected_at, 1_700_000_123);
}

#[test]
fn pinning_an_unseen_id_changes_nothing() {
    let mut store = SelectionStore::default();
    store.record_selection("a", "A", 1);
    let before = store.snapshot();

    assert!(!store.pin("never-recorded"));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn capacity_shrink_waits_for_next_record() {
    let mut store = SelectionStore::builder().history_capacity(5).build();
    for at in 0..5 {
        store.record_selection(&format!("id-{at}"), "x", at);
    }

    store.set_history_capacity(2);
    assert_eq!(store.history().len(), 5);
    assert_eq!(store.snapshot().history_capacity, 2);

    store.record_selection("id-new", "x", 10);
    assert_eq!(store.history().ids(), vec!["id-new", "id-4"]);
}

#[test]
fn clear_history_keeps_pinned() {
    let mut store = SelectionStore::default();
    store.record_selection("a", "A", 1);
    store.pin("a");
    store.clear_history();
    assert!(store.history().is_empty());
    assert_eq!(store.pinned().ids(), vec!["a"]);
}

#[test]
fn mark_missing_flags_without_removing() {
    let mut store = SelectionStore::default();
    store.record_selection("a", "A", 1);
    store.pin("a");

    assert!(store.mark_missing("a", true, true));
    assert!(store.history().get("a").unwrap().is_missing);
    assert!(store.pinned().get("a").unwrap().is_missing);
    assert_eq!(store.history().len(), 1);
    assert!(!store.mark_missing("ghost", true, true));
}

#[test]
fn scan_missing_records_probe_results() {
    let mut store = SelectionStore::default();
    store.record_selection("alive", "Alive", 1);
    store.record_selection("gone", "Gone", 2);
    store.pin("gone");

    let marked = store.scan_missing(&|id: &str| id == "alive");
    assert_eq!(marked, vec!["gone".to_string()]);
    assert!(store.history().get("gone").unwrap().is_missing);
    assert!(store.pinned().get("gone").unwrap().is_missing);
    assert!(!store.history().get("alive").unwrap().is_missing);

    assert!(store.scan_missing(&|id: &str| id == "alive").is_empty());
}

#[test]
fn removing_absent_ids_is_a_quiet_no_op() {
    let mut store = SelectionStore::default();
    assert!(!store.unpin("x"));
    assert!(!store.remove_missing("x"));
}

#[test]
fn restored_state_keeps_order_and_capacities() {
    let mut original = SelectionStore::builder()
        .history_capacity(4)
        .pinned_capacity(Capacity::Bounded(2))
        .build();
    original.record_selection("a", "A", 1);
    original.record_selection("b", "B", 2);
    original.pin("a");

    let restored = SelectionStore::from_state(original.snapshot());
    assert_eq!(restored.snapshot(), original.snapshot());
    assert_eq!(restored.pinned().capacity(), Capacity::Bounded(2));
}

#[test]
fn pinned_capacity_bounds_pins() {
    let mut store = SelectionStore::builder()
        .pinned_capacity(Capacity::Bounded(2))
        .build();
    for id in ["a", "b", "c"] {
        store.record_selection(id, id, 1);
        store.pin(id);
    }
    assert_eq!(store.pinned().ids(), vec!["c", "b"]);
}

#[test]
fn default_state_matches_default_store() {
    assert_eq!(SelectionStore::default().snapshot(), StoreState::default());
}

#[test]
fn set_pinned_capacity_applies_on_next_pin_and_flushes_soon() {
    let urgencies = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&urgencies);
    let mut store = SelectionStore::builder()
        .on_activity(move |_state: StoreState, urgency: Urgency| {
            seen.lock().unwrap().push(urgency);
        })
        .build();
    for id in ["a", "b", "c"] {
        store.record_selection(id, id, 1);
        store.pin(id);
    }
    urgencies.lock().unwrap().clear();

    store.set_pinned_capacity(Capacity::Bounded(1));
    assert_eq!(store.pinned().len(), 3);
    assert_eq!(store.snapshot().pinned_capacity, Capacity::Bounded(1));
    assert_eq!(urgencies.lock().unwrap().as_slice(), &[Urgency::Soon]);

    store.pin("a");
    assert_eq!(store.pinned().ids(), vec!["a"]);

    store.set_pinned_capacity(Capacity::Unbounded);
    store.pin("b");
    assert_eq!(store.pinned().ids(), vec!["b", "a"]);
}
