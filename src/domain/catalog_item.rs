//! Persisted catalog entries and title normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display sentinel stored when the source did not expose a price.
pub const UNKNOWN_PRICE: &str = "unknown";

/// One currently-discounted item as stored in the catalog.
///
/// `key` is the stable external identifier (typically the item URL) and
/// determines at most one live row. Prices are opaque display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Stable external identifier.
    pub key: String,
    /// Display title as scraped.
    pub name: String,
    /// Pre-discount price text, or [`UNKNOWN_PRICE`].
    pub price_original: String,
    /// Discounted price text, or [`UNKNOWN_PRICE`].
    pub price_discounted: String,
    /// Capture time of the latest snapshot that contained this key.
    pub last_seen_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Returns the normalized form of this item's title.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Normalizes a title for subscription matching: trims surrounding
/// whitespace and case-folds.
///
/// Matching on the result is exact, so `"Doom"` and `"Doom Eternal"`
/// stay distinct.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}
