//! Result of applying an accepted snapshot to the catalog.

use serde::Serialize;

use super::catalog_item::CatalogItem;

/// Partition of an accepted snapshot against the previous catalog.
///
/// `is_cold_start` is set when the previous catalog was empty. The diff is
/// still complete in that case; callers decide whether it is alert-worthy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Items whose key was not in the previous catalog.
    pub added: Vec<CatalogItem>,
    /// Keys that were in the previous catalog but not in the snapshot.
    pub removed: Vec<String>,
    /// Items re-observed with refreshed prices and `last_seen_at`.
    pub updated: Vec<CatalogItem>,
    /// Whether the previous catalog was empty.
    pub is_cold_start: bool,
}

impl DiffResult {
    /// Returns `true` if this diff should produce alerts.
    #[must_use]
    pub fn is_alert_worthy(&self) -> bool {
        !self.is_cold_start && !self.added.is_empty()
    }

    /// Size of the catalog after the diff was applied.
    #[must_use]
    pub fn catalog_size(&self) -> usize {
        self.added.len() + self.updated.len()
    }
}
