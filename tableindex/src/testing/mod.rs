//! Helpers for building rows, sessions and indexes in tests.

use std::sync::{Arc, Once};

use tracing_subscriber::EnvFilter;

use crate::descriptor::{IndexColumn, IndexDescriptor, IndexRole, Uniqueness};
use crate::index::TableIndex;
use crate::row::Row;
use crate::session::Snapshot;
use crate::types::{PersistenceId, RowId, SqlType, TxnId, Value};

/// Transaction that wrote the rows built by [`row`].
pub const SETUP_TXN: TxnId = TxnId(1);

static TRACING: Once = Once::new();

/// Route `tracing` output to the test writer, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs the subscriber.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A committed row written by [`SETUP_TXN`].
#[must_use]
pub fn row(id: u64, data: Vec<Value>) -> Arc<Row> {
    Arc::new(Row::new(RowId(id), data, SETUP_TXN))
}

/// A row written by `txn`.
#[must_use]
pub fn row_by(id: u64, data: Vec<Value>, txn: TxnId) -> Arc<Row> {
    Arc::new(Row::new(RowId(id), data, txn))
}

/// A session that sees everything committed before `txn`.
#[must_use]
pub const fn session(txn: u64) -> Snapshot {
    Snapshot::latest(TxnId(txn))
}

/// A user index over integer columns, ascending.
#[must_use]
pub fn int_index(name: &str, uniqueness: Uniqueness, columns: &[usize]) -> TableIndex {
    let role = match uniqueness {
        Uniqueness::PrimaryKey => IndexRole::PrimaryKey,
        Uniqueness::None | Uniqueness::NonUnique | Uniqueness::Unique => IndexRole::User,
    };
    let descriptor = columns.iter().fold(
        IndexDescriptor::new(name, PersistenceId(1), uniqueness, role, 0),
        |descriptor, &ordinal| descriptor.with_column(IndexColumn::new(ordinal, SqlType::Integer)),
    );
    TableIndex::new(descriptor)
}
