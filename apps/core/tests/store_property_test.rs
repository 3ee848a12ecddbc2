use proptest::prelude::*;

use seltrack_core::codec;
use seltrack_core::store::SelectionStore;

#[derive(Debug, Clone)]
enum Op {
    Record(u8),
    Pin(u8),
    Unpin(u8),
    MarkMissing(u8),
    Remove(u8),
    SetCapacity(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0u8..12).prop_map(Op::Record),
        2 => (0u8..12).prop_map(Op::Pin),
        1 => (0u8..12).prop_map(Op::Unpin),
        1 => (0u8..12).prop_map(Op::MarkMissing),
        1 => (0u8..12).prop_map(Op::Remove),
        1 => (0usize..6).prop_map(Op::SetCapacity),
    ]
}

fn apply(store: &mut SelectionStore, op: &Op, clock: &mut i64) {
    match op {
        Op::Record(n) => {
            *clock += 1;
            store.record_selection(&format!("id-{n}"), &format!("Name {n}"), *clock);
        }
        Op::Pin(n) => {
            store.pin(&format!("id-{n}"));
        }
        Op::Unpin(n) => {
            store.unpin(&format!("id-{n}"));
        }
        Op::MarkMissing(n) => {
            store.mark_missing(&format!("id-{n}"), true, true);
        }
        Op::Remove(n) => {
            store.remove_missing(&format!("id-{n}"));
        }
        Op::SetCapacity(capacity) => store.set_history_capacity(*capacity),
    }
}

proptest! {
    #[test]
    fn record_keeps_history_bounded_and_newest_first(
        capacity in 1usize..8,
        ids in proptest::collection::vec(0u8..20, 1..60),
    ) {
        let mut store = SelectionStore::builder().history_capacity(capacity).build();
        for (at, n) in ids.iter().enumerate() {
            let id = format!("id-{n}");
            store.record_selection(&id, "x", at as i64);
            prop_assert!(store.history().len() <= capacity);
            prop_assert_eq!(store.history().first().map(|e| e.id.clone()), Some(id));
        }
    }

    #[test]
    fn ids_stay_unique_under_any_sequence(ops in proptest::collection::vec(op_strategy(), 0..80)) {
        let mut store = SelectionStore::default();
        let mut clock = 0;
        for op in &ops {
            apply(&mut store, op, &mut clock);
        }
        for collection in [store.history(), store.pinned()] {
            let mut seen = collection.ids();
            let len = seen.len();
            seen.sort_unstable();
            seen.dedup();
            prop_assert_eq!(seen.len(), len);
        }
    }

    #[test]
    fn serialize_round_trip_is_lossless(ops in proptest::collection::vec(op_strategy(), 0..80)) {
        let mut store = SelectionStore::default();
        let mut clock = 0;
        for op in &ops {
            apply(&mut store, op, &mut clock);
        }
        let state = store.snapshot();
        let decoded = codec::deserialize(&codec::serialize(&state).unwrap()).unwrap();
        prop_assert_eq!(decoded, state);
    }
}
