//! Query planning
//!
//! Translates a [`HighLevelQuery`] into a [`QueryPlan`] of low-level,
//! parameterized statements grouped by time bucket.
//!
//! # Architecture
//!
//! ```text
//! HighLevelQuery ──┐
//!                  ├──► QueryPlanner::plan ──► QueryPlan
//! CatalogSnapshot ─┘                            │
//!                                               ▼
//!                               bucket → [LowLevelQuery, ...]
//!                                               │
//!                                               ▼  (execution layer)
//!                                         BucketResult
//! ```
//!
//! Planning is synchronous, CPU-only and side-effect free. It never touches
//! the live catalog: every call works on an immutable snapshot.

pub mod error;
pub mod hlq;
pub mod plan;
pub mod planner;
pub mod result;
pub mod statement;

pub use error::{PlanError, PlanResult};
pub use hlq::{HighLevelQuery, HighLevelQueryBuilder};
pub use plan::QueryPlan;
pub use planner::{plan, QueryPlanner};
pub use result::BucketResult;
pub use statement::{AggregationPlacement, LowLevelQuery, StatementArg, StatementLayout};
