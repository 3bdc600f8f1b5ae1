//! End-to-end scenarios driving [`TableIndex`](crate::TableIndex) through
//! sessions and stores the way a table does.

#![cfg(test)]

mod test_check_index;
mod test_concurrent_access;
mod test_exists_parent;
mod test_numeric_keys;
mod test_probes;
mod test_scan_order;
mod test_search_cost;
mod test_uniqueness;
