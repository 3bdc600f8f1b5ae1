//! Several threads sharing one store.

use std::sync::Arc;
use std::thread;

use crate::testing::{int_index, row, session};
use crate::types::Value;
use crate::{IndexCheck, IndexError, IndexStore, Uniqueness};

#[test]
fn test_parallel_writers_and_readers() {
    let index = Arc::new(int_index("ix", Uniqueness::NonUnique, &[0]));
    let store = Arc::new(IndexStore::new());

    let writers: Vec<_> = (0..4_u64)
        .map(|t| {
            let index = Arc::clone(&index);
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let writer = session(5);
                for i in 0..250_u64 {
                    let id = t * 1000 + i;
                    let key = Value::Integer((i % 17).cast_signed());
                    index.insert(&writer, &store, row(id, vec![key])).expect("insert");
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..2)
        .map(|_| {
            let index = Arc::clone(&index);
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let reader = session(5);
                for _ in 0..20 {
                    let rows = index.first_row(&reader, &store, &[], 0).collect_rows().expect("scan");
                    assert!(rows.windows(2).all(|w| index.comparator().compare_entries(&w[0], &w[1]).is_lt()));
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().expect("thread");
    }

    let reader = session(5);
    assert_eq!(index.size(&reader, &store).expect("size"), 1000);
    assert_eq!(index.size_unique(&store).expect("size unique"), 17);
    assert_eq!(index.check_index(&reader, &store).expect("check"), IndexCheck::Ok);
}

#[test]
fn test_racing_unique_inserts_admit_one_winner() {
    let index = Arc::new(int_index("uq", Uniqueness::Unique, &[0]));
    let store = Arc::new(IndexStore::new());

    let handles: Vec<_> = (0..8_u64)
        .map(|t| {
            let index = Arc::clone(&index);
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let writer = session(5);
                index.insert(&writer, &store, row(t, vec![Value::Integer(42)]))
            })
        })
        .collect();

    let results: Vec<Result<(), IndexError>> = handles.into_iter().map(|h| h.join().expect("thread")).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, IndexError::UniqueViolation(_))));
    assert_eq!(index.node_count(&store).expect("count"), 1);
}
