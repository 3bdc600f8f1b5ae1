//! Planner cost estimates.

use crate::testing::{int_index, row, session};
use crate::types::Value;
use crate::{IndexConfig, IndexStore, Residency, SearchCost, Uniqueness};

#[test]
fn test_empty_store_costs_nothing() {
    let index = int_index("pk", Uniqueness::PrimaryKey, &[0]);
    let cost = index.search_cost(&IndexStore::new()).expect("cost");
    assert_eq!(cost, SearchCost::empty(1));
    assert!(cost.traversal_cost.is_finite() && cost.traversal_cost >= 0.0);
    assert!(cost.row_estimate.is_finite() && cost.row_estimate >= 0.0);
}

#[test]
fn test_primary_key_beats_low_cardinality_index() {
    let pk = int_index("pk", Uniqueness::PrimaryKey, &[0]);
    let flag = int_index("ix_flag", Uniqueness::NonUnique, &[1]);
    let pk_store = IndexStore::new();
    let flag_store = IndexStore::new();
    let writer = session(5);

    for id in 0..2000_u64 {
        let data = vec![Value::Integer(id.cast_signed()), Value::Integer((id % 2).cast_signed())];
        pk.insert(&writer, &pk_store, row(id, data.clone())).expect("insert");
        flag.insert(&writer, &flag_store, row(id, data)).expect("insert");
    }

    let pk_cost = pk.search_cost(&pk_store).expect("cost");
    let flag_cost = flag.search_cost(&flag_store).expect("cost");
    assert!((pk_cost.row_estimate - 1.0).abs() < f64::EPSILON);
    assert!(flag_cost.row_estimate > 100.0);
    assert!(pk_cost.traversal_cost < flag_cost.traversal_cost);
}

#[test]
fn test_configured_probe_depth_and_residency() {
    let config = IndexConfig::default().with_probe_depth(2).with_cached_factor(3.0);
    let index = int_index("ix", Uniqueness::NonUnique, &[0]).with_config(config);
    let memory = IndexStore::new();
    let disk = IndexStore::with_residency(Residency::Disk);
    let writer = session(5);
    for id in 0..64_u64 {
        let data = vec![Value::Integer((id / 4).cast_signed())];
        index.insert(&writer, &memory, row(id, data.clone())).expect("insert");
        index.insert(&writer, &disk, row(id, data)).expect("insert");
    }

    let memory_cost = index.search_cost(&memory).expect("cost");
    let disk_cost = index.search_cost(&disk).expect("cost");
    assert_eq!(index.config().probe_depth, 2);
    assert!((disk_cost.traversal_cost - 3.0 * memory_cost.traversal_cost).abs() < 1e-9);
    assert_eq!(memory_cost.rows_per_key.len(), 1);
}
