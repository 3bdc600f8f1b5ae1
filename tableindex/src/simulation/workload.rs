//! Seeded operation generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::condition::CompareOp;
use crate::types::Value;

/// One step of a simulated workload.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Insert a new row with key `(a, b)`.
    Insert { a: Value, b: Value },
    /// Delete the `victim`-th live row (modulo the live count), or a row that
    /// does not exist when there is none.
    Delete { victim: usize },
    /// Full scan, optionally reversed and grouped on leading columns.
    Scan { reversed: bool, distinct_count: usize },
    /// `find_first_row` probe on the first `match_count` columns.
    Probe {
        key: Vec<Value>,
        match_count: usize,
        op: CompareOp,
        reversed: bool,
    },
}

/// Mix and shape of the generated operations.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Key values are drawn from `0..key_range`.
    pub key_range: i64,
    /// Probability that a key value is null.
    pub null_rate: f64,
    /// Probability of a delete.
    pub delete_rate: f64,
    /// Probability of a scan.
    pub scan_rate: f64,
    /// Probability of a probe.
    pub probe_rate: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            key_range: 12,
            null_rate: 0.1,
            delete_rate: 0.25,
            scan_rate: 0.1,
            probe_rate: 0.15,
        }
    }
}

const OPS: [CompareOp; 6] = [
    CompareOp::Equal,
    CompareOp::NotDistinct,
    CompareOp::Greater,
    CompareOp::GreaterEqual,
    CompareOp::Smaller,
    CompareOp::SmallerEqual,
];

/// Deterministic source of [`Operation`]s.
pub struct WorkloadGenerator {
    rng: StdRng,
    config: WorkloadConfig,
}

impl WorkloadGenerator {
    #[must_use]
    pub fn new(seed: u64, config: WorkloadConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            config,
        }
    }

    fn value(&mut self) -> Value {
        if self.rng.random::<f64>() < self.config.null_rate {
            Value::Null
        } else {
            Value::Integer(self.rng.random_range(0..self.config.key_range))
        }
    }

    /// Produce the next operation.
    pub fn next_operation(&mut self) -> Operation {
        let roll = self.rng.random::<f64>();
        let config = &self.config;
        if roll < config.delete_rate {
            return Operation::Delete {
                victim: self.rng.random_range(0..usize::MAX),
            };
        }
        if roll < config.delete_rate + config.scan_rate {
            return Operation::Scan {
                reversed: self.rng.random(),
                distinct_count: self.rng.random_range(0..=2),
            };
        }
        if roll < config.delete_rate + config.scan_rate + config.probe_rate {
            let match_count = self.rng.random_range(1..=2);
            let key = (0..match_count).map(|_| self.value()).collect();
            return Operation::Probe {
                key,
                match_count,
                op: OPS[self.rng.random_range(0..OPS.len())],
                reversed: self.rng.random(),
            };
        }
        Operation::Insert {
            a: self.value(),
            b: self.value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_operations() {
        let mut first = WorkloadGenerator::new(99, WorkloadConfig::default());
        let mut second = WorkloadGenerator::new(99, WorkloadConfig::default());
        for _ in 0..100 {
            let a = format!("{:?}", first.next_operation());
            let b = format!("{:?}", second.next_operation());
            assert_eq!(a, b);
        }
    }
}
