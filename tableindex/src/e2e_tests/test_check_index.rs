//! Consistency checks on healthy and damaged stores.

use std::sync::Arc;

use crate::testing::{int_index, row, session};
use crate::types::Value;
use crate::{IndexCheck, IndexStore, Uniqueness};

#[test]
fn test_healthy_index_passes() {
    let index = int_index("ix", Uniqueness::Unique, &[0]);
    let store = IndexStore::new();
    let writer = session(5);
    for id in 0..100 {
        index
            .insert(&writer, &store, row(id, vec![Value::Integer((id * 7 % 101).cast_signed())]))
            .expect("insert");
    }
    let check = index.check_index(&writer, &store).expect("check");
    assert_eq!(check, IndexCheck::Ok);
    assert_eq!(check.code(), 0);
}

#[test]
fn test_out_of_order_entry_is_reported() {
    let index = int_index("ix", Uniqueness::NonUnique, &[0]);
    let store = IndexStore::new();
    let writer = session(5);
    for id in 0..10 {
        index
            .insert(&writer, &store, row(id, vec![Value::Integer(id.cast_signed())]))
            .expect("insert");
    }

    {
        let mut tree = store.write().expect("lock");
        let first = tree.first().expect("entries");
        tree.node_mut(first).row = row(99, vec![Value::Integer(1000)]);
    }

    let check = index.check_index(&writer, &store).expect("check");
    assert_eq!(check, IndexCheck::Order);
    assert_eq!(check.code(), 1);
}

#[test]
fn test_live_duplicate_is_reported() {
    let index = int_index("uq", Uniqueness::Unique, &[0]);
    let store = IndexStore::new();
    let writer = session(5);
    index.insert(&writer, &store, row(1, vec![Value::Integer(5)])).expect("insert");

    {
        // Bypass the uniqueness check.
        let mut tree = store.write().expect("lock");
        let duplicate = row(2, vec![Value::Integer(5)]);
        let probe = Arc::clone(&duplicate);
        tree.insert_by(duplicate, |existing| index.comparator().compare_entries(&probe, existing));
    }

    assert_eq!(index.check_index(&writer, &store).expect("check"), IndexCheck::DuplicateLiveKey);
}

#[test]
fn test_broken_link_is_reported() {
    let index = int_index("ix", Uniqueness::NonUnique, &[0]);
    let store = IndexStore::new();
    let writer = session(5);
    for id in 0..20 {
        index
            .insert(&writer, &store, row(id, vec![Value::Integer(id.cast_signed())]))
            .expect("insert");
    }

    {
        let mut tree = store.write().expect("lock");
        let last = tree.last().expect("entries");
        tree.node_mut(last).parent = None;
    }

    assert_eq!(index.check_index(&writer, &store).expect("check"), IndexCheck::Link);
}
