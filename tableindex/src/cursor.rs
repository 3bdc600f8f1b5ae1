//! Lazy, directional cursors over index entries.
//!
//! A [`RowCursor`] does not hold the store's lock between calls. Each
//! [`RowCursor::next_row`] takes the read lock, advances one visible entry and
//! remembers the entry it returned together with the store's modification
//! counter. If the store changed in between, the cursor repositions strictly
//! past the remembered entry by key and row id, so:
//!
//! - an entry inserted behind the cursor is never yielded retroactively;
//! - an entry deleted after it was yielded does not disturb the scan.
//!
//! # State machine
//!
//! Opening a cursor seeks its first match. A cursor with nothing to yield
//! starts out `Empty` and stays there.
//!
//! ```text
//! BeforeFirst --next--> Positioned --next--> Positioned
//!      |                    |
//!      +-------next---------+--> Exhausted
//! Empty (absorbing)
//! ```

use std::cmp::Ordering;
use std::sync::Arc;

use crate::avl::{AvlTree, NodeId};
use crate::comparator::KeyComparator;
use crate::condition::{CompareOp, RangeCondition};
use crate::error::IndexError;
use crate::row::Row;
use crate::session::Session;
use crate::store::IndexStore;
use crate::types::Value;

/// Where a cursor stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing matched when the cursor was opened; it never yields.
    Empty,
    /// Opened on a match, nothing yielded yet.
    BeforeFirst,
    /// The last call yielded an entry.
    Positioned,
    /// The bound was passed or the structure consumed.
    Exhausted,
}

/// Scan direction, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Contiguous region of the entry order a cursor walks, plus an optional
/// per-entry filter inside it.
#[derive(Debug, Clone)]
pub(crate) enum Window {
    /// Every entry.
    All,
    /// Equality on the first `match_count - 1` key columns and `op` on the
    /// last one. `key` is in index column order.
    Probe {
        key: Vec<Value>,
        match_count: usize,
        op: CompareOp,
    },
    /// First key column not null.
    NotNull,
    /// One condition per leading key column.
    Range(Vec<RangeCondition>),
}

impl Window {
    /// Classify `row` as before (`Less`), inside (`Equal`) or after
    /// (`Greater`) the window.
    fn locate(&self, cmp: &KeyComparator, row: &Row) -> Ordering {
        match self {
            Self::All => Ordering::Equal,
            Self::Probe { key, match_count, op } => locate_probe(cmp, row, key, *match_count, *op),
            Self::NotNull => {
                if cmp.column_count() == 0 {
                    return Ordering::Equal;
                }
                locate_null(cmp, row, 0).unwrap_or(Ordering::Equal)
            }
            Self::Range(conditions) => locate_range(cmp, row, conditions),
        }
    }

    /// Entries inside the window that still fail a range condition on a
    /// column past the contiguous part are skipped, not treated as the end.
    fn admits(&self, cmp: &KeyComparator, row: &Row) -> bool {
        match self {
            Self::Range(conditions) => conditions
                .iter()
                .enumerate()
                .all(|(i, condition)| within_range(cmp, row, i, condition) == Ordering::Equal),
            Self::All | Self::Probe { .. } | Self::NotNull => true,
        }
    }
}

/// Nulls sit at one end of a column: before the values when ascending,
/// after them when descending.
fn locate_null(cmp: &KeyComparator, row: &Row, position: usize) -> Option<Ordering> {
    if !cmp.key_value(row.data(), position).is_null() {
        return None;
    }
    Some(if cmp.nulls_lead(position) { Ordering::Less } else { Ordering::Greater })
}

fn locate_probe(cmp: &KeyComparator, row: &Row, key: &[Value], match_count: usize, op: CompareOp) -> Ordering {
    let last = match_count - 1;
    for (i, probe) in key.iter().enumerate().take(last) {
        let ordering = cmp.compare_column(i, cmp.key_value(row.data(), i), probe);
        if ordering.is_ne() {
            return ordering;
        }
    }

    if !op.is_equality()
        && let Some(ordering) = locate_null(cmp, row, last)
    {
        return ordering;
    }

    let ordering = cmp.compare_column(last, cmp.key_value(row.data(), last), &key[last]);
    match op {
        CompareOp::Equal | CompareOp::NotDistinct => ordering,
        CompareOp::Greater if ordering == Ordering::Greater => Ordering::Equal,
        CompareOp::GreaterEqual if ordering != Ordering::Less => Ordering::Equal,
        CompareOp::Greater | CompareOp::GreaterEqual => Ordering::Less,
        CompareOp::Smaller if ordering == Ordering::Less => Ordering::Equal,
        CompareOp::SmallerEqual if ordering != Ordering::Greater => Ordering::Equal,
        CompareOp::Smaller | CompareOp::SmallerEqual => Ordering::Greater,
    }
}

/// Position of one column value relative to its range condition.
fn within_range(cmp: &KeyComparator, row: &Row, position: usize, condition: &RangeCondition) -> Ordering {
    if let Some(ordering) = locate_null(cmp, row, position) {
        return ordering;
    }
    let value = cmp.key_value(row.data(), position);
    if let Some(lower) = &condition.lower {
        let ordering = cmp.compare_column(position, value, &lower.value);
        if ordering == Ordering::Less || (ordering == Ordering::Equal && !lower.inclusive) {
            return Ordering::Less;
        }
    }
    if let Some(upper) = &condition.upper {
        let ordering = cmp.compare_column(position, value, &upper.value);
        if ordering == Ordering::Greater || (ordering == Ordering::Equal && !upper.inclusive) {
            return Ordering::Greater;
        }
    }
    Ordering::Equal
}

/// Leading point conditions narrow the region column by column; the first
/// non-point condition closes it.
fn locate_range(cmp: &KeyComparator, row: &Row, conditions: &[RangeCondition]) -> Ordering {
    for (i, condition) in conditions.iter().enumerate() {
        let ordering = within_range(cmp, row, i, condition);
        if ordering.is_ne() {
            return ordering;
        }
        let is_point = match (&condition.lower, &condition.upper) {
            (Some(lower), Some(upper)) => {
                lower.inclusive && upper.inclusive && cmp.compare_column(i, &lower.value, &upper.value).is_eq()
            }
            _ => false,
        };
        if !is_point {
            break;
        }
    }
    Ordering::Equal
}

/// An entry with the counter value it was read under.
#[derive(Debug)]
struct Position {
    node: NodeId,
    stamp: u64,
    row: Arc<Row>,
}

struct Scan<'a> {
    index_name: &'a str,
    store: &'a IndexStore,
    session: Option<&'a dyn Session>,
    comparator: &'a KeyComparator,
    window: Window,
    direction: Direction,
    distinct_count: usize,
    /// First match found when the cursor was opened.
    head: Option<(NodeId, u64)>,
    last: Option<Position>,
}

impl Scan<'_> {
    fn start(&self, tree: &AvlTree) -> Option<NodeId> {
        let cmp = self.comparator;
        match self.direction {
            Direction::Forward => tree.first_at_or_after(|row| self.window.locate(cmp, row)),
            Direction::Reverse => tree.last_at_or_before(|row| self.window.locate(cmp, row)),
        }
    }

    fn step(&self, tree: &AvlTree, id: NodeId) -> Option<NodeId> {
        match self.direction {
            Direction::Forward => tree.next(id),
            Direction::Reverse => tree.prev(id),
        }
    }

    /// First entry strictly past `row` in scan direction, by `order`.
    fn seek_past<F>(&self, tree: &AvlTree, mut order: F) -> Option<NodeId>
    where
        F: FnMut(&Row) -> Ordering,
    {
        match self.direction {
            Direction::Forward => tree.first_at_or_after(|entry| match order(entry) {
                Ordering::Greater => Ordering::Greater,
                Ordering::Less | Ordering::Equal => Ordering::Less,
            }),
            Direction::Reverse => tree.last_at_or_before(|entry| match order(entry) {
                Ordering::Less => Ordering::Less,
                Ordering::Greater | Ordering::Equal => Ordering::Greater,
            }),
        }
    }

    fn resume(&self, tree: &AvlTree, last: &Position) -> Option<NodeId> {
        let cmp = self.comparator;
        if self.distinct_count > 0 {
            let group = last.row.data();
            return self.seek_past(tree, |entry| cmp.compare_prefix(entry.data(), group, self.distinct_count));
        }
        if tree.modifications() == last.stamp {
            return self.step(tree, last.node);
        }
        tracing::debug!(
            "cursor on index {} repositioning after {} (store modified)",
            self.index_name,
            last.row.id()
        );
        self.seek_past(tree, |entry| cmp.compare_entries(entry, &last.row))
    }

    fn is_visible(&self, row: &Row) -> bool {
        self.session.is_none_or(|session| session.can_read(row))
    }

    fn find(&self, tree: &AvlTree, mut candidate: Option<NodeId>) -> Option<NodeId> {
        let ahead = match self.direction {
            Direction::Forward => Ordering::Greater,
            Direction::Reverse => Ordering::Less,
        };
        while let Some(id) = candidate {
            let row = tree.row(id);
            let location = self.window.locate(self.comparator, row);
            if location == ahead {
                return None;
            }
            if location.is_eq() && self.window.admits(self.comparator, row) && self.is_visible(row) {
                return Some(id);
            }
            candidate = self.step(tree, id);
        }
        None
    }
}

/// A positioned, directional, single-pass sequence of index entries.
pub struct RowCursor<'a> {
    state: CursorState,
    scan: Option<Scan<'a>>,
}

impl<'a> RowCursor<'a> {
    /// A cursor that yields nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            state: CursorState::Empty,
            scan: None,
        }
    }

    /// Open a cursor on the first visible entry of `window`, or an empty
    /// cursor when there is none.
    ///
    /// A poisoned store lock leaves the cursor `BeforeFirst`; the first
    /// [`RowCursor::next_row`] then reports the error.
    pub(crate) fn new(
        index_name: &'a str,
        store: &'a IndexStore,
        session: Option<&'a dyn Session>,
        comparator: &'a KeyComparator,
        window: Window,
        direction: Direction,
        distinct_count: usize,
    ) -> Self {
        let mut scan = Scan {
            index_name,
            store,
            session,
            comparator,
            window,
            direction,
            distinct_count,
            head: None,
            last: None,
        };
        if let Ok(tree) = store.read() {
            let Some(id) = scan.find(&tree, scan.start(&tree)) else {
                return Self::empty();
            };
            scan.head = Some((id, tree.modifications()));
        }
        Self {
            state: CursorState::BeforeFirst,
            scan: Some(scan),
        }
    }

    /// Get the cursor state.
    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.state
    }

    /// Get the scan direction (`None` for an empty cursor).
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        self.scan.as_ref().map(|scan| scan.direction)
    }

    /// Advance to the next visible entry.
    ///
    /// Returns `Ok(None)` once the cursor is exhausted; further calls keep
    /// returning `Ok(None)`.
    pub fn next_row(&mut self) -> Result<Option<Arc<Row>>, IndexError> {
        if matches!(self.state, CursorState::Empty | CursorState::Exhausted) {
            return Ok(None);
        }
        let Some(scan) = self.scan.as_mut() else {
            return Ok(None);
        };

        let store = scan.store;
        let tree = store.read()?;
        let candidate = match (&scan.last, scan.head.take()) {
            (Some(last), _) => scan.resume(&tree, last),
            (None, Some((id, stamp))) if stamp == tree.modifications() => Some(id),
            (None, _) => scan.start(&tree),
        };

        if let Some(id) = scan.find(&tree, candidate) {
            let row = Arc::clone(tree.row(id));
            scan.last = Some(Position {
                node: id,
                stamp: tree.modifications(),
                row: Arc::clone(&row),
            });
            self.state = CursorState::Positioned;
            Ok(Some(row))
        } else {
            scan.last = None;
            self.state = CursorState::Exhausted;
            Ok(None)
        }
    }

    /// Drain the cursor.
    pub fn collect_rows(mut self) -> Result<Vec<Arc<Row>>, IndexError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }
}

impl Iterator for RowCursor<'_> {
    type Item = Result<Arc<Row>, IndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

impl std::fmt::Debug for RowCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("state", &self.state)
            .field("direction", &self.direction())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{IndexColumn, IndexDescriptor, IndexRole, Uniqueness};
    use crate::session::Snapshot;
    use crate::types::{PersistenceId, RowId, SqlType, TxnId};

    /// Index on (col 0 asc, col 1 desc).
    fn comparator() -> KeyComparator {
        let d = IndexDescriptor::new("ix", PersistenceId(1), Uniqueness::NonUnique, IndexRole::User, 0)
            .with_column(IndexColumn::new(0, SqlType::Integer))
            .with_column(IndexColumn::new(1, SqlType::Integer).descending());
        KeyComparator::new(&d)
    }

    fn fill(cmp: &KeyComparator, rows: &[(u64, Option<i64>, i64)]) -> IndexStore {
        let store = IndexStore::new();
        {
            let mut tree = store.write().expect("lock");
            for &(id, a, b) in rows {
                let row = Arc::new(Row::new(RowId(id), vec![a.into(), b.into()], TxnId(1)));
                let probe = Arc::clone(&row);
                tree.insert_by(row, |existing| cmp.compare_entries(&probe, existing));
            }
        }
        store
    }

    fn ids(cursor: RowCursor<'_>) -> Vec<u64> {
        cursor
            .collect_rows()
            .expect("scan")
            .iter()
            .map(|r| r.id().get())
            .collect()
    }

    fn sample(cmp: &KeyComparator) -> IndexStore {
        fill(
            cmp,
            &[(1, Some(1), 5), (2, Some(1), 9), (3, Some(2), 0), (4, None, 0), (5, Some(3), 1), (6, Some(2), 7)],
        )
    }

    fn probe(key: Vec<Value>, match_count: usize, op: CompareOp) -> Window {
        Window::Probe { key, match_count, op }
    }

    #[test]
    fn test_empty_cursor() {
        let mut cursor = RowCursor::empty();
        assert_eq!(cursor.state(), CursorState::Empty);
        assert_eq!(cursor.direction(), None);
        assert!(cursor.next_row().expect("empty").is_none());
        assert_eq!(cursor.state(), CursorState::Empty);
    }

    #[test]
    fn test_full_scan_both_directions() {
        let cmp = comparator();
        let store = sample(&cmp);
        // (null,0) (1,9) (1,5) (2,7) (2,0) (3,1)
        let forward = RowCursor::new("ix", &store, None, &cmp, Window::All, Direction::Forward, 0);
        assert_eq!(ids(forward), vec![4, 2, 1, 6, 3, 5]);
        let reverse = RowCursor::new("ix", &store, None, &cmp, Window::All, Direction::Reverse, 0);
        assert_eq!(ids(reverse), vec![5, 3, 6, 1, 2, 4]);
    }

    #[test]
    fn test_state_transitions() {
        let cmp = comparator();
        let store = sample(&cmp);
        let window = probe(vec![Value::Integer(3)], 1, CompareOp::Equal);
        let mut cursor = RowCursor::new("ix", &store, None, &cmp, window, Direction::Forward, 0);
        assert_eq!(cursor.state(), CursorState::BeforeFirst);
        assert!(cursor.next_row().expect("first").is_some());
        assert_eq!(cursor.state(), CursorState::Positioned);
        assert!(cursor.next_row().expect("end").is_none());
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert!(cursor.next_row().expect("still end").is_none());
    }

    #[test]
    fn test_cursor_without_matches_opens_empty() {
        let cmp = comparator();
        let store = sample(&cmp);
        let window = probe(vec![Value::Integer(99)], 1, CompareOp::Equal);
        let mut cursor = RowCursor::new("ix", &store, None, &cmp, window, Direction::Forward, 0);
        assert_eq!(cursor.state(), CursorState::Empty);
        assert!(cursor.next_row().expect("empty").is_none());
        assert_eq!(cursor.state(), CursorState::Empty);

        let empty_store = IndexStore::new();
        let cursor = RowCursor::new("ix", &empty_store, None, &cmp, Window::All, Direction::Reverse, 0);
        assert_eq!(cursor.state(), CursorState::Empty);
    }

    #[test]
    fn test_cursor_opened_before_changes_sees_new_first_entry() {
        let cmp = comparator();
        let store = sample(&cmp);
        let mut cursor = RowCursor::new("ix", &store, None, &cmp, Window::All, Direction::Forward, 0);
        assert_eq!(cursor.state(), CursorState::BeforeFirst);
        {
            let mut tree = store.write().expect("lock");
            let row = Arc::new(Row::new(RowId(20), vec![Value::Null, Value::Integer(9)], TxnId(1)));
            let probe = Arc::clone(&row);
            tree.insert_by(row, |existing| cmp.compare_entries(&probe, existing));
        }
        let first = cursor.next_row().expect("scan").expect("row");
        assert_eq!(first.id(), RowId(20));
    }

    #[test]
    fn test_inequality_probes_skip_nulls() {
        let cmp = comparator();
        let store = sample(&cmp);
        let cases = [
            (CompareOp::Greater, vec![5]),
            (CompareOp::GreaterEqual, vec![6, 3, 5]),
            (CompareOp::Smaller, vec![2, 1]),
            (CompareOp::SmallerEqual, vec![2, 1, 6, 3]),
        ];
        for (op, expected) in cases {
            let window = probe(vec![Value::Integer(2)], 1, op);
            let cursor = RowCursor::new("ix", &store, None, &cmp, window, Direction::Forward, 0);
            assert_eq!(ids(cursor), expected, "op {op}");
        }
    }

    #[test]
    fn test_descending_column_probe_in_index_order() {
        let cmp = comparator();
        let store = sample(&cmp);
        // Column 1 is descending: "greater" in index order means smaller values.
        let window = probe(vec![Value::Integer(1), Value::Integer(7)], 2, CompareOp::Greater);
        let cursor = RowCursor::new("ix", &store, None, &cmp, window, Direction::Forward, 0);
        assert_eq!(ids(cursor), vec![1]);
    }

    #[test]
    fn test_not_null_window() {
        let cmp = comparator();
        let store = sample(&cmp);
        let cursor = RowCursor::new("ix", &store, None, &cmp, Window::NotNull, Direction::Forward, 0);
        assert_eq!(ids(cursor), vec![2, 1, 6, 3, 5]);
        let cursor = RowCursor::new("ix", &store, None, &cmp, Window::NotNull, Direction::Reverse, 0);
        assert_eq!(ids(cursor), vec![5, 3, 6, 1, 2]);
    }

    #[test]
    fn test_range_filter_skips_inside_window() {
        let cmp = comparator();
        let store = sample(&cmp);
        // col0 in [1, 2], col1 (descending) between 8 and 1 in index order.
        let conditions = vec![
            RangeCondition::unbounded()
                .with_lower(crate::condition::RangeBound::inclusive(1_i64))
                .with_upper(crate::condition::RangeBound::inclusive(2_i64)),
            RangeCondition::unbounded()
                .with_lower(crate::condition::RangeBound::inclusive(8_i64))
                .with_upper(crate::condition::RangeBound::inclusive(1_i64)),
        ];
        let cursor = RowCursor::new("ix", &store, None, &cmp, Window::Range(conditions), Direction::Forward, 0);
        assert_eq!(ids(cursor), vec![1, 6]);
    }

    #[test]
    fn test_distinct_groups() {
        let cmp = comparator();
        let store = sample(&cmp);
        let forward = RowCursor::new("ix", &store, None, &cmp, Window::All, Direction::Forward, 1);
        assert_eq!(ids(forward), vec![4, 2, 6, 5]);
        let reverse = RowCursor::new("ix", &store, None, &cmp, Window::All, Direction::Reverse, 1);
        assert_eq!(ids(reverse), vec![5, 3, 1, 4]);
    }

    #[test]
    fn test_invisible_rows_are_skipped() {
        let cmp = comparator();
        let store = sample(&cmp);
        {
            let tree = store.read().expect("lock");
            let first = tree.first().expect("entries");
            tree.row(first).mark_deleted(TxnId(1));
        }
        let session = Snapshot::latest(TxnId(5));
        let cursor = RowCursor::new("ix", &store, Some(&session), &cmp, Window::All, Direction::Forward, 0);
        assert_eq!(ids(cursor), vec![2, 1, 6, 3, 5]);
    }

    #[test]
    fn test_repositions_after_concurrent_changes() {
        let cmp = comparator();
        let store = sample(&cmp);
        let mut cursor = RowCursor::new("ix", &store, None, &cmp, Window::All, Direction::Forward, 0);
        let first = cursor.next_row().expect("scan").expect("row");
        assert_eq!(first.id(), RowId(4));
        let second = cursor.next_row().expect("scan").expect("row");
        assert_eq!(second.id(), RowId(2));

        {
            let mut tree = store.write().expect("lock");
            // Remove the entry just yielded and add one behind and one ahead.
            let yielded = tree
                .ids()
                .find(|&n| tree.row(n).id() == RowId(2))
                .expect("present");
            tree.remove(yielded);
            for (id, a, b) in [(10_u64, 0_i64, 0_i64), (11, 2, 3)] {
                let row = Arc::new(Row::new(RowId(id), vec![Value::Integer(a), Value::Integer(b)], TxnId(1)));
                let probe = Arc::clone(&row);
                tree.insert_by(row, |existing| cmp.compare_entries(&probe, existing));
            }
        }

        let rest: Vec<u64> = cursor.map(|r| r.expect("scan").id().get()).collect();
        assert_eq!(rest, vec![1, 6, 11, 3, 5]);
    }
}
