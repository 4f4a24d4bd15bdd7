//! Low-level parameterized statements
//!
//! A [`LowLevelQuery`] is a prepared-statement template plus its bound
//! arguments. The row identifier and time bounds are always bound as
//! arguments, never spliced into the text. The aggregation function and the
//! table name are embedded: both come from trusted configuration and the
//! catalog, not from untrusted input.
//!
//! For one (aggregation, table) pair the statement text is always identical,
//! so an executor can prepare it once and reuse it for every binding:
//!
//! ```text
//! SELECT avg(value) FROM cpu WHERE series_id = ? AND timestamp_ns >= ? AND timestamp_ns < ?
//!                                              ^                    ^                   ^
//!                                           row id               start                end
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ============================================================================
// Statement Layout
// ============================================================================

/// Where the aggregation function is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPlacement {
    /// The storage engine aggregates: `SELECT avg(value) ...`
    #[default]
    Server,

    /// The executor fetches raw values and aggregates itself: `SELECT value ...`
    Client,
}

impl fmt::Display for AggregationPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationPlacement::Server => write!(f, "server"),
            AggregationPlacement::Client => write!(f, "client"),
        }
    }
}

impl std::str::FromStr for AggregationPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(AggregationPlacement::Server),
            "client" => Ok(AggregationPlacement::Client),
            other => Err(format!("unknown aggregation placement: {}", other)),
        }
    }
}

/// Column names and aggregation placement used to render statement text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementLayout {
    /// Column holding the series / row identifier
    pub series_column: String,

    /// Column holding nanosecond timestamps
    pub time_column: String,

    /// Column holding the measured value
    pub value_column: String,

    /// Where aggregation happens
    pub placement: AggregationPlacement,
}

impl Default for StatementLayout {
    fn default() -> Self {
        Self {
            series_column: "series_id".to_string(),
            time_column: "timestamp_ns".to_string(),
            value_column: "value".to_string(),
            placement: AggregationPlacement::Server,
        }
    }
}

impl StatementLayout {
    /// Render the statement text for one (aggregation, table) pair
    pub fn render(&self, aggregation: &str, table: &str) -> String {
        let projection = match self.placement {
            AggregationPlacement::Server => format!("{}({})", aggregation, self.value_column),
            AggregationPlacement::Client => self.value_column.clone(),
        };

        format!(
            "SELECT {} FROM {} WHERE {} = ? AND {} >= ? AND {} < ?",
            projection, table, self.series_column, self.time_column, self.time_column
        )
    }
}

// ============================================================================
// Bound Arguments
// ============================================================================

/// One bound statement argument
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementArg {
    /// Text value (row identifier)
    Text(String),

    /// 64-bit integer (nanosecond timestamp)
    BigInt(i64),
}

impl fmt::Display for StatementArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementArg::Text(s) => write!(f, "{:?}", s),
            StatementArg::BigInt(n) => write!(f, "{}", n),
        }
    }
}

// ============================================================================
// Low-Level Query
// ============================================================================

/// Immutable statement template plus its ordered arguments
///
/// Arguments are always `(row id, start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LowLevelQuery {
    statement: Arc<str>,
    args: Vec<StatementArg>,
}

impl LowLevelQuery {
    /// Build a server-aggregated statement with the default column layout
    ///
    /// # Example
    ///
    /// ```rust
    /// use tsq_planner::query::{LowLevelQuery, StatementArg};
    ///
    /// let q = LowLevelQuery::new("avg", "cpu", "s1", 1500, 1800);
    /// assert_eq!(
    ///     q.statement(),
    ///     "SELECT avg(value) FROM cpu WHERE series_id = ? AND timestamp_ns >= ? AND timestamp_ns < ?"
    /// );
    /// assert_eq!(q.args()[0], StatementArg::Text("s1".to_string()));
    /// assert_eq!(q.time_bounds(), Some((1500, 1800)));
    /// ```
    pub fn new(
        aggregation: &str,
        table: &str,
        row_id: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Self {
        let statement = StatementLayout::default().render(aggregation, table);
        Self::bind(Arc::from(statement), row_id, start, end)
    }

    /// Bind arguments to already-rendered statement text
    ///
    /// Lets many queries share one statement allocation.
    pub fn bind(statement: Arc<str>, row_id: &str, start: Timestamp, end: Timestamp) -> Self {
        Self {
            statement,
            args: vec![
                StatementArg::Text(row_id.to_string()),
                StatementArg::BigInt(start),
                StatementArg::BigInt(end),
            ],
        }
    }

    /// Statement text with `?` placeholders
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Shared handle to the statement text
    pub fn statement_arc(&self) -> &Arc<str> {
        &self.statement
    }

    /// Bound arguments in placeholder order
    pub fn args(&self) -> &[StatementArg] {
        &self.args
    }

    /// The bound row identifier
    pub fn row_id(&self) -> Option<&str> {
        match self.args.first() {
            Some(StatementArg::Text(id)) => Some(id),
            _ => None,
        }
    }

    /// The bound `(start, end)` pair
    pub fn time_bounds(&self) -> Option<(Timestamp, Timestamp)> {
        match (self.args.get(1), self.args.get(2)) {
            (Some(StatementArg::BigInt(start)), Some(StatementArg::BigInt(end))) => {
                Some((*start, *end))
            },
            _ => None,
        }
    }
}

impl fmt::Display for LowLevelQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "{} [{}]", self.statement, args.join(", "))
    }
}
