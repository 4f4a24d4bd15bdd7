//! Client-side series catalog
//!
//! The catalog is the in-memory registry of physical series consulted instead
//! of asking the storage engine which series match a filter.
//!
//! ```text
//! population (append-only)         planning (read-only)
//! ┌──────────────────┐  snapshot  ┌──────────────────┐
//! │  SeriesCatalog   │──────────▶│ CatalogSnapshot  │──▶ QueryPlanner
//! │  RwLock<Vec<_>>  │            │  Arc<[Series]>   │
//! └──────────────────┘            └──────────────────┘
//! ```
//!
//! A snapshot is an independent, immutable copy of the series list. Cloning
//! it is cheap and it can be shared across planning threads without locking.

pub mod series;

pub use series::Series;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

// ============================================================================
// Series Source
// ============================================================================

/// Anything that can hand the planner a consistent view of known series
pub trait SeriesSource {
    /// Take a snapshot of all registered series
    fn snapshot(&self) -> CatalogSnapshot;
}

// ============================================================================
// Catalog Snapshot
// ============================================================================

/// Immutable view of the catalog's series at one point in time
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    series: Arc<[Series]>,
}

impl CatalogSnapshot {
    /// Build a snapshot directly from a list of series
    pub fn from_series(series: Vec<Series>) -> Self {
        Self {
            series: series.into(),
        }
    }

    /// Iterate over the series
    pub fn iter(&self) -> std::slice::Iter<'_, Series> {
        self.series.iter()
    }

    /// Series as a slice
    pub fn as_slice(&self) -> &[Series] {
        &self.series
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// True if the snapshot holds no series
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl SeriesSource for CatalogSnapshot {
    fn snapshot(&self) -> CatalogSnapshot {
        self.clone()
    }
}

impl<'a> IntoIterator for &'a CatalogSnapshot {
    type Item = &'a Series;
    type IntoIter = std::slice::Iter<'a, Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Series Catalog
// ============================================================================

/// Append-only registry of known series
///
/// Populated once by the loader, then only read through snapshots. Series are
/// kept in registration order; registering the same series twice keeps both
/// entries, matching the loader's view of the metadata it scanned.
#[derive(Debug, Default)]
pub struct SeriesCatalog {
    series: RwLock<Vec<Series>>,
}

impl SeriesCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one series
    pub fn register(&self, series: Series) {
        debug!(
            table = %series.table,
            id = %series.id,
            measurement = %series.measurement,
            field = %series.field,
            "Registered series"
        );
        self.series.write().push(series);
    }

    /// Register many series under a single write lock
    pub fn extend<I>(&self, series: I)
    where
        I: IntoIterator<Item = Series>,
    {
        let mut guard = self.series.write();
        let before = guard.len();
        guard.extend(series);
        debug!(added = guard.len() - before, total = guard.len(), "Registered series batch");
    }

    /// Number of registered series
    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }
}

impl SeriesSource for SeriesCatalog {
    fn snapshot(&self) -> CatalogSnapshot {
        let guard = self.series.read();
        trace!(series = guard.len(), "Taking catalog snapshot");
        CatalogSnapshot {
            series: Arc::from(guard.as_slice()),
        }
    }
}

impl FromIterator<Series> for SeriesCatalog {
    fn from_iter<I: IntoIterator<Item = Series>>(iter: I) -> Self {
        Self {
            series: RwLock::new(iter.into_iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TagSet, TimeInterval};

    fn series(id: &str) -> Series {
        Series::new(
            "cpu",
            id,
            "cpu",
            "usage_user",
            TagSet::from_pairs(&[("host", id)]),
            TimeInterval::new(0, 100).unwrap(),
        )
    }

    #[test]
    fn test_register_and_len() {
        let catalog = SeriesCatalog::new();
        assert!(catalog.is_empty());

        catalog.register(series("a"));
        catalog.extend(vec![series("b"), series("c")]);

        assert_eq!(catalog.len(), 3);
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_registrations() {
        let catalog = SeriesCatalog::new();
        catalog.register(series("a"));

        let snapshot = catalog.snapshot();
        catalog.register(series("b"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(catalog.snapshot().len(), 2);
    }

    #[test]
    fn test_snapshot_preserves_registration_order() {
        let catalog: SeriesCatalog = ["x", "y", "z"].into_iter().map(series).collect();
        let snapshot = catalog.snapshot();
        let ids: Vec<&str> = snapshot.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_snapshot_clone_shares_storage() {
        let snapshot = CatalogSnapshot::from_series(vec![series("a")]);
        let copy = snapshot.snapshot();
        assert!(std::ptr::eq(snapshot.as_slice(), copy.as_slice()));
    }

    #[test]
    fn test_concurrent_snapshots() {
        let catalog = Arc::new(SeriesCatalog::new());
        catalog.extend((0..100).map(|i| series(&i.to_string())));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                std::thread::spawn(move || catalog.snapshot().len())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 100);
        }
    }
}
