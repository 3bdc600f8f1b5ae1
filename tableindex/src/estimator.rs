//! Search cost estimation by sampling the top of the tree.
//!
//! The estimator never walks the whole structure. It takes the entries at
//! depth `probe_depth` or less (at most `2^(probe_depth + 1) - 1` of them, in
//! key order) and counts how often each key prefix changes between neighbouring
//! samples. Equal neighbours mean every entry between them shares the prefix;
//! a change is credited with at most `minimum_selectivity` distinct prefixes.
//! Absolute numbers are rough. An index with more distinct keys comes out
//! cheaper per probe than one with fewer.

use crate::avl::AvlTree;
use crate::comparator::KeyComparator;
use crate::config::IndexConfig;
use crate::store::Residency;

/// Planner-facing cost of probing an index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCost {
    /// Tree descent plus rows read for one full-key probe, scaled for
    /// disk-resident stores.
    pub traversal_cost: f64,
    /// Expected rows returned by one full-key equality probe.
    pub row_estimate: f64,
    /// `rows_per_key[i]`: expected rows per distinct value of the first
    /// `i + 1` key columns.
    pub rows_per_key: Vec<f64>,
}

impl SearchCost {
    /// Cost of probing an empty index.
    #[must_use]
    pub fn empty(column_count: usize) -> Self {
        Self {
            traversal_cost: 0.0,
            row_estimate: 0.0,
            rows_per_key: vec![0.0; column_count],
        }
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn estimate(
    tree: &AvlTree,
    comparator: &KeyComparator,
    config: &IndexConfig,
    residency: Residency,
    unique: bool,
) -> SearchCost {
    let column_count = comparator.column_count();
    if tree.is_empty() {
        return SearchCost::empty(column_count);
    }

    let entries = tree.len() as f64;
    let sample = tree.sample(config.probe_depth);
    let exhaustive = sample.len() == tree.len();
    // Keys between two neighbouring samples one observed change may stand for.
    let span = (entries / sample.len() as f64).min(config.minimum_selectivity);

    // changes[i]: neighbouring samples differing within the first i + 1 columns.
    let mut changes = vec![0usize; column_count];
    for pair in sample.windows(2) {
        let before = tree.row(pair[0]).data();
        let after = tree.row(pair[1]).data();
        if let Some(position) = comparator.compare_row_for_change(before, after) {
            for count in &mut changes[position..] {
                *count += 1;
            }
        }
    }

    let rows_per_key: Vec<f64> = changes
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            if unique && i + 1 == column_count {
                return 1.0;
            }
            let distinct = if exhaustive {
                (count + 1) as f64
            } else {
                (1.0 + count as f64 * span).min(entries)
            };
            (entries / distinct).max(1.0)
        })
        .collect();

    let row_estimate = rows_per_key.last().copied().unwrap_or(entries);
    let factor = match residency {
        Residency::Memory => 1.0,
        Residency::Disk => config.cached_factor,
    };
    let traversal_cost = (tree.height() as f64 + row_estimate) * factor;

    SearchCost {
        traversal_cost,
        row_estimate,
        rows_per_key,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::descriptor::{IndexColumn, IndexDescriptor, IndexRole, Uniqueness};
    use crate::row::Row;
    use crate::types::{PersistenceId, RowId, SqlType, TxnId, Value};

    fn comparator(columns: usize) -> KeyComparator {
        let mut d = IndexDescriptor::new("ix", PersistenceId(1), Uniqueness::NonUnique, IndexRole::User, 0);
        for ordinal in 0..columns {
            d = d.with_column(IndexColumn::new(ordinal, SqlType::Integer));
        }
        KeyComparator::new(&d)
    }

    fn tree_of(cmp: &KeyComparator, keys: impl IntoIterator<Item = (i64, i64)>) -> AvlTree {
        let mut tree = AvlTree::new();
        for (id, (a, b)) in (0_u64..).zip(keys) {
            let row = Arc::new(Row::new(
                RowId(id),
                vec![Value::Integer(a), Value::Integer(b)],
                TxnId(1),
            ));
            let probe = Arc::clone(&row);
            tree.insert_by(row, |existing| cmp.compare_entries(&probe, existing));
        }
        tree
    }

    #[test]
    fn test_empty_tree_costs_nothing() {
        let cost = estimate(&AvlTree::new(), &comparator(2), &IndexConfig::default(), Residency::Disk, true);
        assert_eq!(cost, SearchCost::empty(2));
        assert!(cost.traversal_cost >= 0.0);
        assert!(cost.row_estimate >= 0.0);
    }

    #[test]
    fn test_small_tree_is_counted_exactly() {
        let cmp = comparator(2);
        // Three distinct values of column 0, every full key distinct.
        let tree = tree_of(&cmp, [(1, 1), (1, 2), (2, 1), (2, 2), (3, 1), (3, 2)]);
        let cost = estimate(&tree, &cmp, &IndexConfig::default(), Residency::Memory, false);
        assert_eq!(cost.rows_per_key, vec![2.0, 1.0]);
        assert!((cost.row_estimate - 1.0).abs() < f64::EPSILON);
        assert!((cost.traversal_cost - (tree.height() as f64 + 1.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_selective_index_is_cheaper() {
        let cmp = comparator(2);
        let config = IndexConfig::default().with_probe_depth(3);
        let selective = tree_of(&cmp, (0..5000).map(|i| (i, 0)));
        let skewed = tree_of(&cmp, (0..5000).map(|i| (i % 4, 0)));

        let selective = estimate(&selective, &cmp, &config, Residency::Memory, false);
        let skewed = estimate(&skewed, &cmp, &config, Residency::Memory, false);
        assert!(selective.rows_per_key[0] < skewed.rows_per_key[0]);
        assert!(selective.traversal_cost < skewed.traversal_cost);
        // 14 changes in a 15-entry sample, each credited with 16 keys.
        assert!((selective.rows_per_key[0] - 5000.0 / (1.0 + 14.0 * 16.0)).abs() < 1e-9);
    }

    #[test]
    fn test_disk_residency_scales_cost() {
        let cmp = comparator(2);
        let tree = tree_of(&cmp, (0..100).map(|i| (i, i)));
        let config = IndexConfig::default();
        let memory = estimate(&tree, &cmp, &config, Residency::Memory, true);
        let disk = estimate(&tree, &cmp, &config, Residency::Disk, true);
        assert!((disk.traversal_cost - memory.traversal_cost * config.cached_factor).abs() < 1e-9);
        assert!((memory.row_estimate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_keyless_index_estimates_every_row() {
        let cmp = comparator(0);
        let tree = tree_of(&comparator(2), (0..10).map(|i| (i, i)));
        let cost = estimate(&tree, &cmp, &IndexConfig::default(), Residency::Memory, false);
        assert!(cost.rows_per_key.is_empty());
        assert!((cost.row_estimate - 10.0).abs() < f64::EPSILON);
    }
}
