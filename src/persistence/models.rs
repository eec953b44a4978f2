//! Row shapes returned by catalog and subscription queries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{CatalogItem, RecipientId};

/// Column tuple selected by catalog read queries, in
/// [`CATALOG_COLUMNS`] order.
pub type CatalogRow = (String, String, String, String, DateTime<Utc>);

/// Column list matching [`CatalogRow`].
pub const CATALOG_COLUMNS: &str = "key, name, price_original, price_discounted, last_seen_at";

/// Converts a selected row into a [`CatalogItem`].
#[must_use]
pub fn catalog_item_from_row(row: CatalogRow) -> CatalogItem {
    let (key, name, price_original, price_discounted, last_seen_at) = row;
    CatalogItem {
        key,
        name,
        price_original,
        price_discounted,
        last_seen_at,
    }
}

/// A stored per-item subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSubscription {
    /// Subscribed recipient.
    pub recipient_id: RecipientId,
    /// Normalized tracked title.
    pub normalized_name: String,
    /// When the subscription was created.
    pub created_at: DateTime<Utc>,
}

impl From<(i64, String, DateTime<Utc>)> for ItemSubscription {
    fn from((recipient_id, normalized_name, created_at): (i64, String, DateTime<Utc>)) -> Self {
        Self {
            recipient_id: RecipientId::new(recipient_id),
            normalized_name,
            created_at,
        }
    }
}
