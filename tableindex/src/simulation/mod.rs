//! Deterministic simulation of index workloads.
//!
//! A seeded generator produces a stream of inserts, deletes, scans and
//! probes. The simulator applies each one to a real [`TableIndex`] and to a
//! plain model of the live rows, then checks the index against the model:
//! - structure and order are consistent (`check_index`);
//! - the visible size matches the model;
//! - every scan and probe returns exactly the model's answer, in order;
//! - unique conflicts are reported exactly when the model holds the key.
//!
//! Given the same seed, execution is identical.
//!
//! [`TableIndex`]: crate::TableIndex

#![cfg(test)]

mod invariants;
mod simulator;
mod workload;
