//! The index core.
//!
//! [`TableIndex`] owns no entries. Every operation is handed the
//! [`IndexStore`] holding the index's tree and, where visibility matters, the
//! caller's [`Session`]. The index contributes the ordering (through its
//! [`KeyComparator`]), uniqueness enforcement and cursor construction.
//!
//! # Invariants
//!
//! - Entries are totally ordered by key, then row id.
//! - A unique index never holds two entries with equal non-null keys that both
//!   block each other. Dead duplicates (rolled back inserts, committed
//!   deletes awaiting cleanup) may sit next to one live entry.
//! - Keys containing a null never conflict.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::avl::AvlTree;
use crate::comparator::KeyComparator;
use crate::condition::{CompareOp, RangeCondition};
use crate::config::IndexConfig;
use crate::cursor::{Direction, RowCursor, Window};
use crate::descriptor::IndexDescriptor;
use crate::error::{IndexCheck, IndexError, UniqueViolation};
use crate::estimator::{self, SearchCost};
use crate::row::Row;
use crate::session::Session;
use crate::store::IndexStore;
use crate::types::{RowId, Value};

/// Stateless driver of one index over the stores handed to it.
#[derive(Debug, Clone)]
pub struct TableIndex {
    descriptor: IndexDescriptor,
    comparator: KeyComparator,
    config: IndexConfig,
}

impl TableIndex {
    /// Create the index for a descriptor with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the descriptor is inconsistent (see
    /// [`IndexDescriptor::validate`]).
    #[must_use]
    pub fn new(descriptor: IndexDescriptor) -> Self {
        descriptor.validate();
        let comparator = KeyComparator::new(&descriptor);
        Self {
            descriptor,
            comparator,
            config: IndexConfig::default(),
        }
    }

    /// Replace the estimator configuration.
    #[must_use]
    pub const fn with_config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn descriptor(&self) -> &IndexDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub const fn comparator(&self) -> &KeyComparator {
        &self.comparator
    }

    #[must_use]
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Set the clustering flag (table rebuilds).
    pub const fn set_clustered(&mut self, clustered: bool) {
        self.descriptor.set_clustered(clustered);
    }

    /// Set the storage position within the table (table rebuilds).
    pub const fn set_position(&mut self, position: usize) {
        self.descriptor.set_position(position);
    }

    /// Link `row` into the index.
    ///
    /// In a unique index, an existing entry with an equal non-null key that
    /// blocks `session` rejects the insert and leaves the store unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::UniqueViolation`] on a key conflict and
    /// [`IndexError::LockPoisoned`] if the store lock is poisoned.
    pub fn insert(&self, session: &dyn Session, store: &IndexStore, row: Arc<Row>) -> Result<(), IndexError> {
        let mut tree = store.write()?;

        if self.descriptor.is_unique()
            && !self.comparator.has_null(row.data(), self.comparator.column_count())
            && let Some(existing_row) = self.find_blocking(&tree, session, &row)
        {
            let violation = UniqueViolation {
                index_name: self.name().to_string(),
                key: self.comparator.key_of(row.data()),
                existing_row,
            };
            tracing::warn!("{violation}");
            return Err(violation.into());
        }

        let id = row.id();
        let new_row = Arc::clone(&row);
        tree.insert_by(row, |existing| self.comparator.compare_entries(&new_row, existing));
        tracing::trace!("index {}: inserted {id}", self.name());
        Ok(())
    }

    fn find_blocking(&self, tree: &AvlTree, session: &dyn Session, row: &Row) -> Option<RowId> {
        let mut candidate = tree.first_at_or_after(|entry| self.comparator.compare_row(entry.data(), row.data()));
        while let Some(id) = candidate {
            let entry = tree.row(id);
            if self.comparator.compare_row(entry.data(), row.data()).is_ne() {
                return None;
            }
            if entry.id() != row.id() && session.blocks_unique(entry) {
                return Some(entry.id());
            }
            candidate = tree.next(id);
        }
        None
    }

    /// Unlink the entry of `row`, matched by key and row id.
    ///
    /// Returns `Ok(false)` if the entry is not there: a concurrent delete may
    /// already have removed it. Deletion is by identity, so the session's
    /// visibility rules are not consulted.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the store lock is poisoned.
    pub fn delete(&self, _session: &dyn Session, store: &IndexStore, row: &Row) -> Result<bool, IndexError> {
        let mut tree = store.write()?;
        let found = tree
            .first_at_or_after(|entry| self.comparator.compare_entries(entry, row))
            .filter(|&id| self.comparator.compare_entries(tree.row(id), row).is_eq());

        let Some(id) = found else {
            tracing::debug!("index {}: delete of {} found no entry", self.name(), row.id());
            return Ok(false);
        };
        tree.remove(id);
        tracing::trace!("index {}: deleted {}", self.name(), row.id());
        Ok(true)
    }

    /// Position a cursor on the entries matching a probe.
    ///
    /// `probe` holds key values in index column order. The first
    /// `match_count - 1` columns must equal the probe and the last matched
    /// column must satisfy `op`. With `distinct_count > 0` only the first
    /// entry of each group of equal leading `distinct_count` columns is
    /// returned. A null in the matched probe columns yields an empty cursor
    /// unless `op` is [`CompareOp::NotDistinct`].
    ///
    /// # Panics
    ///
    /// Panics if `match_count` is zero or exceeds the key or the probe, or if
    /// `distinct_count` exceeds the key.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn find_first_row<'a>(
        &'a self,
        session: &'a dyn Session,
        store: &'a IndexStore,
        probe: &[Value],
        match_count: usize,
        distinct_count: usize,
        op: CompareOp,
        reversed: bool,
    ) -> RowCursor<'a> {
        let column_count = self.comparator.column_count();
        assert!(
            (1..=column_count).contains(&match_count),
            "match count {match_count} outside 1..={column_count} for index {}",
            self.name()
        );
        assert!(
            match_count <= probe.len(),
            "match count {match_count} exceeds probe of {} values",
            probe.len()
        );
        self.check_distinct_count(distinct_count);

        if op != CompareOp::NotDistinct && probe[..match_count].iter().any(Value::is_null) {
            return RowCursor::empty();
        }

        let window = Window::Probe {
            key: probe[..match_count].to_vec(),
            match_count,
            op,
        };
        let direction = if reversed { Direction::Reverse } else { Direction::Forward };
        self.cursor(Some(session), store, window, direction, distinct_count)
    }

    /// Position a cursor on the entries whose key is not distinct from the
    /// key of a full row of this table.
    #[must_use]
    pub fn find_first_row_for_table_row<'a>(
        &'a self,
        session: &'a dyn Session,
        store: &'a IndexStore,
        row_data: &[Value],
    ) -> RowCursor<'a> {
        let column_count = self.comparator.column_count();
        if column_count == 0 {
            return self.cursor(Some(session), store, Window::All, Direction::Forward, 0);
        }
        let probe = self.comparator.key_of(row_data);
        self.find_first_row(session, store, &probe, column_count, 0, CompareOp::NotDistinct, false)
    }

    /// Position a cursor on the entries equal to columns of another row.
    ///
    /// `row_col_map[i]` names the column of `row_data` matched against key
    /// column `i`.
    ///
    /// # Panics
    ///
    /// Panics if the map is empty or longer than the key.
    #[must_use]
    pub fn find_first_row_mapped<'a>(
        &'a self,
        session: &'a dyn Session,
        store: &'a IndexStore,
        row_data: &[Value],
        row_col_map: &[usize],
    ) -> RowCursor<'a> {
        assert!(
            !row_col_map.is_empty() && row_col_map.len() <= self.comparator.column_count(),
            "column map of {} columns does not fit index {} of {} columns",
            row_col_map.len(),
            self.name(),
            self.comparator.column_count()
        );
        let probe: Vec<Value> = row_col_map.iter().map(|&c| row_data[c].clone()).collect();
        self.find_first_row(session, store, &probe, probe.len(), 0, CompareOp::Equal, false)
    }

    /// Position a cursor on the first entry whose leading key column is not
    /// null.
    #[must_use]
    pub fn find_first_row_not_null<'a>(&'a self, session: &'a dyn Session, store: &'a IndexStore) -> RowCursor<'a> {
        self.cursor(Some(session), store, Window::NotNull, Direction::Forward, 0)
    }

    /// Forward cursor over every entry, ignoring visibility.
    #[must_use]
    pub fn first_row_unbounded<'a>(&'a self, store: &'a IndexStore) -> RowCursor<'a> {
        self.cursor(None, store, Window::All, Direction::Forward, 0)
    }

    /// Forward cursor from the first visible entry, optionally limited by one
    /// range condition per leading key column.
    ///
    /// # Panics
    ///
    /// Panics if there are more conditions or a larger `distinct_count` than
    /// key columns.
    #[must_use]
    pub fn first_row<'a>(
        &'a self,
        session: &'a dyn Session,
        store: &'a IndexStore,
        conditions: &[RangeCondition],
        distinct_count: usize,
    ) -> RowCursor<'a> {
        let window = self.range_window(conditions);
        self.check_distinct_count(distinct_count);
        self.cursor(Some(session), store, window, Direction::Forward, distinct_count)
    }

    /// Reverse cursor from the last visible entry, optionally limited by one
    /// range condition per leading key column.
    ///
    /// # Panics
    ///
    /// As [`TableIndex::first_row`].
    #[must_use]
    pub fn last_row<'a>(
        &'a self,
        session: &'a dyn Session,
        store: &'a IndexStore,
        conditions: &[RangeCondition],
        distinct_count: usize,
    ) -> RowCursor<'a> {
        let window = self.range_window(conditions);
        self.check_distinct_count(distinct_count);
        self.cursor(Some(session), store, window, Direction::Reverse, distinct_count)
    }

    /// A cursor that yields nothing.
    #[must_use]
    pub const fn empty_cursor() -> RowCursor<'static> {
        RowCursor::empty()
    }

    /// Does a visible entry match the mapped columns of `row_data`?
    ///
    /// This is the foreign key check: `row_data` is the referencing row and
    /// the map selects its foreign key columns.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the store lock is poisoned.
    pub fn exists_parent(
        &self,
        session: &dyn Session,
        store: &IndexStore,
        row_data: &[Value],
        row_col_map: &[usize],
    ) -> Result<bool, IndexError> {
        let mut cursor = self.find_first_row_mapped(session, store, row_data, row_col_map);
        Ok(cursor.next_row()?.is_some())
    }

    /// Number of entries visible to `session`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the store lock is poisoned.
    pub fn size(&self, session: &dyn Session, store: &IndexStore) -> Result<usize, IndexError> {
        let tree = store.read()?;
        Ok(tree.ids().filter(|&id| session.can_read(tree.row(id))).count())
    }

    /// Number of distinct full keys among all entries.
    ///
    /// Every entry of a keyless index counts as its own key.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the store lock is poisoned.
    pub fn size_unique(&self, store: &IndexStore) -> Result<usize, IndexError> {
        let tree = store.read()?;
        if self.comparator.column_count() == 0 {
            return Ok(tree.len());
        }
        let mut count = 0;
        let mut previous: Option<&Arc<Row>> = None;
        for id in tree.ids() {
            let row = tree.row(id);
            if previous.is_none_or(|p| self.comparator.compare_row(p.data(), row.data()).is_ne()) {
                count += 1;
            }
            previous = Some(row);
        }
        Ok(count)
    }

    /// Number of entries regardless of visibility.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the store lock is poisoned.
    #[allow(clippy::unused_self)]
    pub fn node_count(&self, store: &IndexStore) -> Result<usize, IndexError> {
        store.len()
    }

    /// Returns true if the store holds no entries at all.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the store lock is poisoned.
    #[allow(clippy::unused_self)]
    pub fn is_empty(&self, store: &IndexStore) -> Result<bool, IndexError> {
        Ok(store.len()? == 0)
    }

    /// Verify the store's structure, entry order and, for unique indexes,
    /// that no key is held by two entries visible to `session`.
    ///
    /// Inconsistencies are reported, not raised; the caller decides how
    /// severe they are.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the store lock is poisoned.
    pub fn check_index(&self, session: &dyn Session, store: &IndexStore) -> Result<IndexCheck, IndexError> {
        let tree = store.read()?;
        let result = match tree.verify_structure() {
            IndexCheck::Ok => self.check_entries(&tree, session),
            failure => failure,
        };
        if !result.is_ok() {
            tracing::error!("index {} failed consistency check: {result}", self.name());
        }
        Ok(result)
    }

    fn check_entries(&self, tree: &AvlTree, session: &dyn Session) -> IndexCheck {
        let column_count = self.comparator.column_count();
        let unique = self.descriptor.is_unique();
        let mut previous: Option<&Arc<Row>> = None;
        let mut live_in_group = 0usize;

        for id in tree.ids() {
            let row = tree.row(id);
            let same_key = match previous {
                Some(p) => {
                    if self.comparator.compare_entries(p, row) != Ordering::Less {
                        return IndexCheck::Order;
                    }
                    self.comparator.compare_row(p.data(), row.data()).is_eq()
                }
                None => false,
            };
            if !same_key {
                live_in_group = 0;
            }
            if unique && !self.comparator.has_null(row.data(), column_count) && session.can_read(row) {
                live_in_group += 1;
                if live_in_group > 1 {
                    return IndexCheck::DuplicateLiveKey;
                }
            }
            previous = Some(row);
        }
        IndexCheck::Ok
    }

    /// Estimate the cost of probing this index in `store`.
    ///
    /// Reads at most `2^(probe_depth + 1) - 1` entries.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::LockPoisoned`] if the store lock is poisoned.
    pub fn search_cost(&self, store: &IndexStore) -> Result<SearchCost, IndexError> {
        let tree = store.read()?;
        let cost = estimator::estimate(
            &tree,
            &self.comparator,
            &self.config,
            store.residency(),
            self.descriptor.is_unique(),
        );
        tracing::debug!(
            "index {}: search cost {:.2}, {:.2} rows per probe",
            self.name(),
            cost.traversal_cost,
            cost.row_estimate
        );
        Ok(cost)
    }

    fn range_window(&self, conditions: &[RangeCondition]) -> Window {
        assert!(
            conditions.len() <= self.comparator.column_count(),
            "{} range conditions exceed index {} of {} columns",
            conditions.len(),
            self.name(),
            self.comparator.column_count()
        );
        if conditions.is_empty() {
            Window::All
        } else {
            Window::Range(conditions.to_vec())
        }
    }

    fn check_distinct_count(&self, distinct_count: usize) {
        assert!(
            distinct_count <= self.comparator.column_count(),
            "distinct count {distinct_count} exceeds index {} of {} columns",
            self.name(),
            self.comparator.column_count()
        );
    }

    fn cursor<'a>(
        &'a self,
        session: Option<&'a dyn Session>,
        store: &'a IndexStore,
        window: Window,
        direction: Direction,
        distinct_count: usize,
    ) -> RowCursor<'a> {
        RowCursor::new(
            self.descriptor.name(),
            store,
            session,
            &self.comparator,
            window,
            direction,
            distinct_count,
        )
    }
}
