use super::BPlusTreeMap;
use proptest::collection::btree_set as pset;
use proptest::collection::vec as pvec;
use proptest::prelude::*;
use std::collections::{BTreeMap as StdBTreeMap, BTreeSet};
use test_strategy::proptest;

#[derive(Debug, Clone)]
enum Operation {
    Insert { key: Vec<u8>, value: Vec<u8> },
    Iter,
    Get(usize),
    Remove(usize),
}

// A custom strategy that gives unequal weights to the different operations.
// `Insert` outweighs `Remove` so that, on average, maps grow as operations
// are executed. The key space is kept small so duplicate inserts and
// refused removals both occur.
fn op_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (pvec(any::<u8>(), 0..4), pvec(any::<u8>(), 0..8))
            .prop_map(|(key, value)| Operation::Insert { key, value }),
        1 => Just(Operation::Iter),
        2 => (any::<usize>()).prop_map(Operation::Get),
        1 => (any::<usize>()).prop_map(Operation::Remove),
    ]
}

// Runs a comprehensive test for the major map operations.
// Results are validated against a standard BTreeMap.
#[proptest(cases = 10)]
fn comprehensive(#[strategy(pvec(op_strategy(), 100..1_000))] ops: Vec<Operation>) {
    let mut map = BPlusTreeMap::new();
    let mut std_map = StdBTreeMap::new();

    // Execute all the operations, validating that the map behaves like a
    // std btreemap wherever the contracts coincide.
    for op in ops.into_iter() {
        execute_operation(&mut std_map, &mut map, op);
        map.check_invariants();
    }
}

// The std model mirrors the map's refusal semantics: a duplicate insert
// changes nothing, and a removal only lands in the model when the map
// accepted it.
fn execute_operation(
    std_map: &mut StdBTreeMap<Vec<u8>, Vec<u8>>,
    map: &mut BPlusTreeMap<Vec<u8>, Vec<u8>>,
    op: Operation,
) {
    match op {
        Operation::Insert { key, value } => {
            eprintln!("Insert({}, {})", hex::encode(&key), hex::encode(&value));
            let inserted = map.insert(key.clone(), value.clone());
            assert_eq!(inserted, !std_map.contains_key(&key));
            if inserted {
                std_map.insert(key, value);
            } else {
                // The first value wins.
                assert_eq!(map.get(&key), std_map.get(&key));
            }
        }
        Operation::Iter => {
            eprintln!("Iterate");
            assert_eq!(map.iter().count() as u64, map.len());
            for ((k1, v1), (k2, v2)) in map.iter().zip(std_map.iter()) {
                assert_eq!(k1, k2);
                assert_eq!(v1, v2);
            }
        }
        Operation::Get(index) => {
            if std_map.is_empty() {
                return;
            }
            let key = std_map.keys().nth(index % std_map.len()).unwrap().clone();
            eprintln!("Get({})", hex::encode(&key));
            assert_eq!(map.get(&key), std_map.get(&key));
            assert!(map.contains_key(&key));
        }
        Operation::Remove(index) => {
            if std_map.is_empty() {
                return;
            }
            let key = std_map.keys().nth(index % std_map.len()).unwrap().clone();
            eprintln!("Remove({})", hex::encode(&key));
            if map.remove(&key) {
                assert!(std_map.remove(&key).is_some());
                assert_eq!(map.get(&key), None);
            } else {
                // Refused by the occupancy guard; nothing changed.
                assert_eq!(map.get(&key), std_map.get(&key));
            }
        }
    }
    assert_eq!(map.len(), std_map.len() as u64);
}

#[proptest]
fn iteration_is_sorted_and_complete(#[strategy(pset(any::<u64>(), 0..500))] keys: BTreeSet<u64>) {
    let mut map = BPlusTreeMap::new();
    for &key in keys.iter().rev() {
        prop_assert!(map.insert(key, key.wrapping_mul(3)));
    }

    let walked: Vec<u64> = map.keys().copied().collect();
    let expected: Vec<u64> = keys.iter().copied().collect();
    prop_assert_eq!(walked, expected);
    map.check_invariants();
}

#[proptest]
fn first_insert_wins(
    #[strategy(pvec((any::<u16>(), any::<u32>()), 1..300))] pairs: Vec<(u16, u32)>,
) {
    let mut map = BPlusTreeMap::new();
    let mut std_map = StdBTreeMap::new();

    for (key, value) in pairs {
        let inserted = map.insert(key, value);
        prop_assert_eq!(inserted, !std_map.contains_key(&key));
        std_map.entry(key).or_insert(value);
    }

    for (key, value) in &std_map {
        prop_assert_eq!(map.get(key), Some(value));
    }
    prop_assert_eq!(map.len(), std_map.len() as u64);
    map.check_invariants();
}

#[proptest(cases = 32)]
fn invariants_hold_at_small_fanouts(
    #[strategy(4usize..=16)] fanout: usize,
    #[strategy(pvec(any::<u16>(), 1..400))] keys: Vec<u16>,
) {
    let mut map = BPlusTreeMap::with_fanout(fanout);
    for key in keys {
        map.insert(key, key);
        map.check_invariants();
    }
}
