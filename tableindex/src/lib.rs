//! Ordered table indexes for a relational engine.
//!
//! An index maps the key columns of a table's rows to the rows themselves,
//! keeps its entries in key order, enforces uniqueness and hands out cursors
//! for equality and range lookups in either direction.
//!
//! Components, leaves first:
//!  - [`KeyComparator`]: three-way ordering of rows on the key columns
//!  - [`avl`]: the arena-backed balanced tree holding the entries
//!  - [`IndexStore`]: the storage partition owning one tree behind a lock
//!  - [`RowCursor`]: lazy, directional, restartable scans
//!  - [`SearchCost`]: sampled cost estimates for the planner
//!  - [`IndexDescriptor`]: static facts about an index
//!  - [`TableIndex`]: the stateless core driving a store for a descriptor
//!
//! Visibility is never decided here. Every searching or mutating call takes
//! the caller's [`Session`], and [`Snapshot`] is the snapshot-isolation
//! implementation used when no transaction manager supplies one.

#![cfg_attr(test, allow(clippy::disallowed_methods, clippy::unwrap_used, clippy::expect_used))]

pub mod avl;
mod comparator;
mod condition;
mod config;
mod cursor;
mod descriptor;
mod error;
mod estimator;
mod index;
mod row;
mod session;
mod store;
pub mod testing;
pub mod types;

mod e2e_tests;
mod simulation;

pub use comparator::KeyComparator;
pub use condition::{CompareOp, RangeBound, RangeCondition};
pub use config::{ConfigError, IndexConfig};
pub use cursor::{CursorState, Direction, RowCursor};
pub use descriptor::{IndexColumn, IndexDescriptor, IndexOrder, IndexRole, IndexUse, Uniqueness};
pub use error::{IndexCheck, IndexError, UniqueViolation};
pub use estimator::SearchCost;
pub use index::TableIndex;
pub use row::Row;
pub use session::{Session, Snapshot};
pub use store::{IndexStore, Residency};
pub use types::{Collation, PersistenceId, RowId, SqlType, TxnId, Value};
