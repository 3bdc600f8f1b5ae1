//! Cost estimator configuration.
//!
//! # Environment Variables
//!
//! - `TABLEINDEX_PROBE_DEPTH`: tree depth sampled by the estimator (default: `4`, range 1-16)
//! - `TABLEINDEX_MINIMUM_SELECTIVITY`: cap on distinct keys extrapolated per sampled key (default: `16`)
//! - `TABLEINDEX_CACHED_FACTOR`: cost multiplier for disk-resident stores (default: `8`)
//!
//! # Invariants
//!
//! - `probe_depth` is always in 1..=16
//! - `minimum_selectivity` and `cached_factor` are finite and at least 1

use serde::{Deserialize, Serialize};

/// Tuning knobs of the search cost estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Depth of the tree levels sampled when estimating selectivity.
    /// The sample holds at most `2^(probe_depth + 1) - 1` entries.
    pub probe_depth: usize,
    /// Upper bound on how many distinct keys one sampled key change may stand for.
    pub minimum_selectivity: f64,
    /// Traversal cost multiplier applied to stores paged from disk.
    pub cached_factor: f64,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            probe_depth: Self::DEFAULT_PROBE_DEPTH,
            minimum_selectivity: Self::DEFAULT_MINIMUM_SELECTIVITY,
            cached_factor: Self::DEFAULT_CACHED_FACTOR,
        }
    }
}

impl IndexConfig {
    pub const DEFAULT_PROBE_DEPTH: usize = 4;
    pub const DEFAULT_MINIMUM_SELECTIVITY: f64 = 16.0;
    pub const DEFAULT_CACHED_FACTOR: f64 = 8.0;
    pub const MAX_PROBE_DEPTH: usize = 16;

    const PROBE_DEPTH_VAR: &'static str = "TABLEINDEX_PROBE_DEPTH";
    const MINIMUM_SELECTIVITY_VAR: &'static str = "TABLEINDEX_MINIMUM_SELECTIVITY";
    const CACHED_FACTOR_VAR: &'static str = "TABLEINDEX_CACHED_FACTOR";

    /// Load configuration from environment variables.
    ///
    /// Unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed or is out
    /// of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`IndexConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(Self::PROBE_DEPTH_VAR) {
            config.probe_depth = Self::parse_probe_depth(&value)?;
        }
        if let Some(value) = lookup(Self::MINIMUM_SELECTIVITY_VAR) {
            config.minimum_selectivity = Self::parse_factor(Self::MINIMUM_SELECTIVITY_VAR, &value)?;
        }
        if let Some(value) = lookup(Self::CACHED_FACTOR_VAR) {
            config.cached_factor = Self::parse_factor(Self::CACHED_FACTOR_VAR, &value)?;
        }

        tracing::debug!(
            "index config: probe_depth={}, minimum_selectivity={}, cached_factor={}",
            config.probe_depth,
            config.minimum_selectivity,
            config.cached_factor
        );
        Ok(config)
    }

    /// Set the sampled depth.
    ///
    /// # Panics
    ///
    /// Panics if `probe_depth` is outside 1..=16.
    #[must_use]
    pub fn with_probe_depth(mut self, probe_depth: usize) -> Self {
        assert!(
            (1..=Self::MAX_PROBE_DEPTH).contains(&probe_depth),
            "probe depth {probe_depth} outside 1..={}",
            Self::MAX_PROBE_DEPTH
        );
        self.probe_depth = probe_depth;
        self
    }

    /// Set the selectivity floor.
    ///
    /// # Panics
    ///
    /// Panics if the factor is not finite or below 1.
    #[must_use]
    pub fn with_minimum_selectivity(mut self, minimum_selectivity: f64) -> Self {
        assert!(is_valid_factor(minimum_selectivity), "minimum selectivity {minimum_selectivity} must be finite and >= 1");
        self.minimum_selectivity = minimum_selectivity;
        self
    }

    /// Set the disk cost multiplier.
    ///
    /// # Panics
    ///
    /// Panics if the factor is not finite or below 1.
    #[must_use]
    pub fn with_cached_factor(mut self, cached_factor: f64) -> Self {
        assert!(is_valid_factor(cached_factor), "cached factor {cached_factor} must be finite and >= 1");
        self.cached_factor = cached_factor;
        self
    }

    fn parse_probe_depth(value: &str) -> Result<usize, ConfigError> {
        match value.trim().parse::<usize>() {
            Ok(depth) if (1..=Self::MAX_PROBE_DEPTH).contains(&depth) => Ok(depth),
            _ => Err(ConfigError::InvalidValue {
                name: Self::PROBE_DEPTH_VAR.to_string(),
                message: format!("'{value}' is not a depth between 1 and {}", Self::MAX_PROBE_DEPTH),
            }),
        }
    }

    fn parse_factor(name: &str, value: &str) -> Result<f64, ConfigError> {
        match value.trim().parse::<f64>() {
            Ok(factor) if is_valid_factor(factor) => Ok(factor),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{value}' is not a finite number >= 1"),
            }),
        }
    }
}

fn is_valid_factor(value: f64) -> bool {
    value.is_finite() && value >= 1.0
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<IndexConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        IndexConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[]).expect("defaults");
        assert_eq!(config, IndexConfig::default());
        assert_eq!(config.probe_depth, 4);
        assert!((config.minimum_selectivity - 16.0).abs() < f64::EPSILON);
        assert!((config.cached_factor - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TABLEINDEX_PROBE_DEPTH", "6"),
            ("TABLEINDEX_MINIMUM_SELECTIVITY", "4.5"),
            ("TABLEINDEX_CACHED_FACTOR", " 2 "),
        ])
        .expect("valid overrides");
        assert_eq!(config.probe_depth, 6);
        assert!((config.minimum_selectivity - 4.5).abs() < f64::EPSILON);
        assert!((config.cached_factor - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_values() {
        let error = load(&[("TABLEINDEX_PROBE_DEPTH", "0")]).expect_err("zero depth");
        assert_eq!(
            error.to_string(),
            "invalid value for TABLEINDEX_PROBE_DEPTH: '0' is not a depth between 1 and 16"
        );
        assert!(load(&[("TABLEINDEX_CACHED_FACTOR", "NaN")]).is_err());
        assert!(load(&[("TABLEINDEX_MINIMUM_SELECTIVITY", "0.5")]).is_err());
    }

    #[test]
    fn test_builder() {
        let config = IndexConfig::default().with_probe_depth(2).with_cached_factor(1.0);
        assert_eq!(config.probe_depth, 2);
        let json = serde_json::to_string(&config).expect("serialize");
        let back: IndexConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }

    #[test]
    #[should_panic(expected = "probe depth")]
    fn test_builder_rejects_deep_probe() {
        let _ = IndexConfig::default().with_probe_depth(17);
    }
}
