//! Planner configuration
//!
//! TOML file support, environment variable overrides and sensible defaults.
//!
//! ```toml
//! clamp_to_query_range = true
//! max_buckets = 100000
//! aggregation_placement = "server"
//! series_column = "series_id"
//! time_column = "timestamp_ns"
//! value_column = "value"
//! parallel_threshold = 4
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::query::statement::{AggregationPlacement, StatementLayout};

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlannerConfig {
    /// Clamp bucket bounds to the query range when binding arguments
    /// (InfluxQL rounded GROUP BY boundaries)
    #[serde(default = "default_true")]
    pub clamp_to_query_range: bool,

    /// Maximum buckets per query (0 = unlimited)
    #[serde(default = "default_max_buckets")]
    pub max_buckets: usize,

    /// Where the aggregation function is evaluated
    #[serde(default)]
    pub aggregation_placement: AggregationPlacement,

    /// Column holding the series / row identifier
    #[serde(default = "default_series_column")]
    pub series_column: String,

    /// Column holding nanosecond timestamps
    #[serde(default = "default_time_column")]
    pub time_column: String,

    /// Column holding the measured value
    #[serde(default = "default_value_column")]
    pub value_column: String,

    /// Minimum batch size before batch planning goes parallel
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

// Default value functions
fn default_true() -> bool { true }
fn default_max_buckets() -> usize { 100_000 }
fn default_series_column() -> String { "series_id".to_string() }
fn default_time_column() -> String { "timestamp_ns".to_string() }
fn default_value_column() -> String { "value".to_string() }
fn default_parallel_threshold() -> usize { 4 }

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            clamp_to_query_range: true,
            max_buckets: default_max_buckets(),
            aggregation_placement: AggregationPlacement::default(),
            series_column: default_series_column(),
            time_column: default_time_column(),
            value_column: default_value_column(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables only
    ///
    /// Not validated here; `QueryPlanner::with_config` validates before use.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable values are ignored and the current setting is kept.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(clamp) = std::env::var("TSQ_CLAMP_TO_QUERY_RANGE") {
            if let Ok(c) = clamp.parse() {
                self.clamp_to_query_range = c;
            }
        }
        if let Ok(max_buckets) = std::env::var("TSQ_MAX_BUCKETS") {
            if let Ok(m) = max_buckets.parse() {
                self.max_buckets = m;
            }
        }
        if let Ok(placement) = std::env::var("TSQ_AGGREGATION_PLACEMENT") {
            if let Ok(p) = placement.parse() {
                self.aggregation_placement = p;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, column) in [
            ("series_column", &self.series_column),
            ("time_column", &self.time_column),
            ("value_column", &self.value_column),
        ] {
            if column.is_empty() {
                return Err(Error::Configuration(format!("{} cannot be empty", name)));
            }
            if !column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::Configuration(format!(
                    "{} must be a plain identifier, got {:?}",
                    name, column
                )));
            }
        }

        if self.parallel_threshold == 0 {
            return Err(Error::Configuration(
                "parallel_threshold must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    /// Statement layout derived from the column and placement settings
    pub fn statement_layout(&self) -> StatementLayout {
        StatementLayout {
            series_column: self.series_column.clone(),
            time_column: self.time_column.clone(),
            value_column: self.value_column.clone(),
            placement: self.aggregation_placement,
        }
    }
}
