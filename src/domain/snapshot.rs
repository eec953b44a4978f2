//! Raw snapshots produced by an acquirer.
//!
//! A [`RawSnapshot`] is never persisted as-is; it must first pass the
//! completeness validator and is then applied through the catalog store.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog_item::{CatalogItem, UNKNOWN_PRICE};

/// One scraped record, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    /// Title as shown by the source.
    pub name: String,
    /// Stable identifying link or key.
    pub key: String,
    /// Pre-discount price text, if the source exposed one.
    pub price_original: Option<String>,
    /// Discounted price text, if the source exposed one.
    pub price_discounted: Option<String>,
}

impl RawItem {
    /// Creates a record without price information.
    #[must_use]
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            price_original: None,
            price_discounted: None,
        }
    }

    /// Attaches original and discounted price text.
    #[must_use]
    pub fn with_prices(mut self, original: impl Into<String>, discounted: impl Into<String>) -> Self {
        self.price_original = Some(original.into());
        self.price_discounted = Some(discounted.into());
        self
    }

    /// Converts the record into a catalog item observed at `seen_at`,
    /// filling missing or blank prices with [`UNKNOWN_PRICE`].
    #[must_use]
    pub fn to_catalog_item(&self, seen_at: DateTime<Utc>) -> CatalogItem {
        CatalogItem {
            key: self.key.trim().to_string(),
            name: self.name.trim().to_string(),
            price_original: price_or_unknown(self.price_original.as_deref()),
            price_discounted: price_or_unknown(self.price_discounted.as_deref()),
            last_seen_at: seen_at,
        }
    }
}

fn price_or_unknown(price: Option<&str>) -> String {
    match price.map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => UNKNOWN_PRICE.to_string(),
    }
}

/// One full read of the external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSnapshot {
    /// Records in source order.
    pub items: Vec<RawItem>,
    /// When the read happened.
    pub captured_at: DateTime<Utc>,
    /// Item count the source itself claims; `0` when unknown.
    pub reported_total: u64,
}

impl RawSnapshot {
    /// Creates a snapshot captured now.
    #[must_use]
    pub fn new(items: Vec<RawItem>, reported_total: u64) -> Self {
        Self {
            items,
            captured_at: Utc::now(),
            reported_total,
        }
    }

    /// Number of records observed.
    #[must_use]
    pub fn observed(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keeps only records that can be stored: blank keys are dropped and,
    /// for keys repeated after trimming, the first occurrence wins.
    ///
    /// [`observed`](Self::observed) then counts distinct usable keys.
    #[must_use]
    pub fn into_usable(mut self) -> Self {
        let mut seen = HashSet::with_capacity(self.items.len());
        self.items.retain(|item| {
            let key = item.key.trim();
            !key.is_empty() && seen.insert(key.to_string())
        });
        self
    }
}
