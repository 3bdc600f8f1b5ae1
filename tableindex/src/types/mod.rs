//! Core value and identifier types shared by every layer of the index.

mod ids;
mod value;

pub use ids::{PersistenceId, RowId, TxnId};
pub use value::{Collation, SqlType, Value};
