//! Simulator harness tying the workload, the index and the checks together.

use std::sync::Arc;

use super::invariants::{self, InvariantChecker, InvariantViolation};
use super::workload::{Operation, WorkloadConfig, WorkloadGenerator};
use crate::descriptor::{IndexColumn, IndexDescriptor, IndexRole, Uniqueness};
use crate::error::{IndexCheck, IndexError};
use crate::index::TableIndex;
use crate::row::Row;
use crate::session::Snapshot;
use crate::store::IndexStore;
use crate::types::{PersistenceId, RowId, SqlType, TxnId, Value};

/// Configuration for the simulator.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Uniqueness kind of the simulated index.
    pub uniqueness: Uniqueness,
    /// Operation mix.
    pub workload: WorkloadConfig,
    /// Run the full consistency check after every operation, not only at the end.
    pub check_every_step: bool,
}

impl SimulatorConfig {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            uniqueness: Uniqueness::NonUnique,
            workload: WorkloadConfig::default(),
            check_every_step: true,
        }
    }

    #[must_use]
    pub const fn with_uniqueness(mut self, uniqueness: Uniqueness) -> Self {
        self.uniqueness = uniqueness;
        self
    }

    #[must_use]
    pub fn with_workload(mut self, workload: WorkloadConfig) -> Self {
        self.workload = workload;
        self
    }

    #[must_use]
    pub const fn without_step_checks(mut self) -> Self {
        self.check_every_step = false;
        self
    }
}

/// Results from a simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    pub seed: u64,
    pub operations: usize,
    pub inserts: usize,
    pub conflicts: usize,
    pub deletes: usize,
    pub reads: usize,
    pub invariant_violations: Vec<InvariantViolation>,
}

impl SimulationResult {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.invariant_violations.is_empty()
    }
}

/// Applies a generated workload to an index and its model.
pub struct Simulator {
    config: SimulatorConfig,
    generator: WorkloadGenerator,
    checker: InvariantChecker,
    index: TableIndex,
    store: IndexStore,
    session: Snapshot,
    live: Vec<Arc<Row>>,
    next_id: u64,
}

impl Simulator {
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        let role = if config.uniqueness.is_unique() {
            IndexRole::UniqueConstraint
        } else {
            IndexRole::User
        };
        // (col 0 asc, col 1 desc) so both null placements are exercised.
        let descriptor = IndexDescriptor::new("sim_ix", PersistenceId(1), config.uniqueness, role, 0)
            .with_column(IndexColumn::new(0, SqlType::Integer))
            .with_column(IndexColumn::new(1, SqlType::Integer).descending());

        Self {
            generator: WorkloadGenerator::new(config.seed, config.workload.clone()),
            checker: InvariantChecker::new(),
            index: TableIndex::new(descriptor),
            store: IndexStore::new(),
            session: Snapshot::latest(TxnId(2)),
            live: Vec::new(),
            next_id: 0,
            config,
        }
    }

    /// Run `operation_count` generated operations.
    pub fn run(&mut self, operation_count: usize) -> SimulationResult {
        let mut result = SimulationResult {
            seed: self.config.seed,
            operations: operation_count,
            inserts: 0,
            conflicts: 0,
            deletes: 0,
            reads: 0,
            invariant_violations: Vec::new(),
        };

        for step in 0..operation_count {
            let operation = self.generator.next_operation();
            if let Err(e) = self.apply(step, &operation, &mut result) {
                self.checker
                    .add_violation("operation failed", step, format!("{operation:?}: {e}"));
            }
            if self.config.check_every_step || step + 1 == operation_count {
                self.check_state(step);
            }
        }

        result.invariant_violations = self.checker.violations().to_vec();
        result
    }

    fn apply(&mut self, step: usize, operation: &Operation, result: &mut SimulationResult) -> Result<(), IndexError> {
        let comparator = self.index.comparator();
        match operation {
            Operation::Insert { a, b } => {
                let row = Arc::new(Row::new(RowId(self.next_id), vec![a.clone(), b.clone()], TxnId(1)));
                self.next_id += 1;
                let expected_conflict = if self.index.descriptor().is_unique() {
                    invariants::conflicting(comparator, &self.live, row.data())
                } else {
                    None
                };

                match (self.index.insert(&self.session, &self.store, Arc::clone(&row)), expected_conflict) {
                    (Ok(()), None) => {
                        self.live.push(row);
                        result.inserts += 1;
                    }
                    (Err(IndexError::UniqueViolation(violation)), Some(existing)) => {
                        self.checker.check_equal("conflicting row", &existing, &violation.existing_row, step);
                        result.conflicts += 1;
                    }
                    (Err(IndexError::UniqueViolation(violation)), None) => {
                        self.checker.add_violation("unexpected unique violation", step, violation.to_string());
                    }
                    (Ok(()), Some(existing)) => {
                        self.live.push(row);
                        self.checker
                            .add_violation("duplicate key accepted", step, format!("key already held by {existing}"));
                    }
                    (Err(e), _) => return Err(e),
                }
            }
            Operation::Delete { victim } => {
                if self.live.is_empty() {
                    let ghost = Row::new(RowId(u64::MAX), vec![Value::Null, Value::Null], TxnId(1));
                    let deleted = self.index.delete(&self.session, &self.store, &ghost)?;
                    self.checker.check_equal("delete of missing row", &false, &deleted, step);
                } else {
                    let row = self.live.swap_remove(victim % self.live.len());
                    let deleted = self.index.delete(&self.session, &self.store, &row)?;
                    self.checker.check_equal("delete of live row", &true, &deleted, step);
                    result.deletes += 1;
                }
            }
            Operation::Scan { reversed, distinct_count } => {
                let cursor = if *reversed {
                    self.index.last_row(&self.session, &self.store, &[], *distinct_count)
                } else {
                    self.index.first_row(&self.session, &self.store, &[], *distinct_count)
                };
                let actual = ids(cursor.collect_rows()?);
                let expected = invariants::expected_scan(comparator, &self.live, *reversed, *distinct_count);
                self.checker.check_rows("scan", &expected, &actual, step);
                result.reads += 1;
            }
            Operation::Probe {
                key,
                match_count,
                op,
                reversed,
            } => {
                let cursor =
                    self.index
                        .find_first_row(&self.session, &self.store, key, *match_count, 0, *op, *reversed);
                let actual = ids(cursor.collect_rows()?);
                let expected = invariants::expected_probe(comparator, &self.live, key, *match_count, *op, *reversed);
                self.checker.check_rows(&format!("probe {op}"), &expected, &actual, step);
                result.reads += 1;
            }
        }
        Ok(())
    }

    fn check_state(&mut self, step: usize) {
        match self.index.check_index(&self.session, &self.store) {
            Ok(IndexCheck::Ok) => {}
            Ok(check) => self.checker.add_violation("consistency check failed", step, check.to_string()),
            Err(e) => self.checker.add_violation("consistency check errored", step, e.to_string()),
        }
        match self.index.size(&self.session, &self.store) {
            Ok(size) => self.checker.check_equal("size", &self.live.len(), &size, step),
            Err(e) => self.checker.add_violation("size errored", step, e.to_string()),
        }
    }
}

fn ids(rows: Vec<Arc<Row>>) -> Vec<RowId> {
    rows.iter().map(|r| r.id()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::init_tracing;

    #[test]
    fn test_non_unique_workloads() {
        init_tracing();
        for seed in [1, 42, 12345] {
            let mut sim = Simulator::new(SimulatorConfig::new(seed));
            let result = sim.run(600);
            assert!(result.passed(), "seed {seed}: {:#?}", result.invariant_violations);
            assert!(result.inserts > 0 && result.deletes > 0 && result.reads > 0);
        }
    }

    #[test]
    fn test_unique_workloads() {
        for seed in [7, 99, 2024] {
            let config = SimulatorConfig::new(seed).with_uniqueness(Uniqueness::Unique);
            let mut sim = Simulator::new(config);
            let result = sim.run(600);
            assert!(result.passed(), "seed {seed}: {:#?}", result.invariant_violations);
            assert!(result.conflicts > 0, "seed {seed} produced no conflicts");
        }
    }

    #[test]
    fn test_long_run_with_final_check() {
        let workload = WorkloadConfig {
            key_range: 200,
            delete_rate: 0.3,
            ..WorkloadConfig::default()
        };
        let config = SimulatorConfig::new(31337)
            .with_workload(workload)
            .without_step_checks();
        let mut sim = Simulator::new(config);
        let result = sim.run(5000);
        assert!(result.passed(), "{:#?}", result.invariant_violations);
    }

    #[test]
    fn test_same_seed_same_result() {
        let run = |seed| {
            let mut sim = Simulator::new(SimulatorConfig::new(seed));
            let result = sim.run(300);
            (result.inserts, result.deletes, result.reads)
        };
        assert_eq!(run(5), run(5));
    }
}
