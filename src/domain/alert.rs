//! Alerts waiting in a recipient's delivery queue.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::catalog_item::CatalogItem;

/// Upper bound on rendered message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Number of new items listed inside a summary alert.
pub const SUMMARY_PREVIEW_LIMIT: usize = 10;

/// What an alert is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertPayload {
    /// Once-per-cycle digest for general subscribers.
    Summary {
        /// Number of items added in the cycle.
        added_count: usize,
        /// First few added items, in source order.
        preview: Vec<CatalogItem>,
    },
    /// A specific item a recipient asked to track went on sale.
    Tracked {
        /// The item as it was at detection time.
        item: CatalogItem,
    },
}

/// One queued alert for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingAlert {
    /// Correlation id for logs.
    pub id: Uuid,
    /// Alert content.
    pub payload: AlertPayload,
    /// When the alert entered the queue.
    pub enqueued_at: DateTime<Utc>,
}

impl PendingAlert {
    /// Builds a summary alert from the items added in a cycle.
    #[must_use]
    pub fn summary(added: &[CatalogItem]) -> Self {
        Self::new(AlertPayload::Summary {
            added_count: added.len(),
            preview: added.iter().take(SUMMARY_PREVIEW_LIMIT).cloned().collect(),
        })
    }

    /// Builds a targeted alert for one tracked item.
    #[must_use]
    pub fn tracked(item: CatalogItem) -> Self {
        Self::new(AlertPayload::Tracked { item })
    }

    fn new(payload: AlertPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            enqueued_at: Utc::now(),
        }
    }

    /// Short label used in log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self.payload {
            AlertPayload::Summary { .. } => "summary",
            AlertPayload::Tracked { .. } => "tracked",
        }
    }

    /// Renders the message text handed to the transport, capped at
    /// [`MAX_MESSAGE_CHARS`].
    #[must_use]
    pub fn render(&self) -> String {
        match &self.payload {
            AlertPayload::Summary {
                added_count,
                preview,
            } => render_summary(*added_count, preview),
            AlertPayload::Tracked { item } => {
                let mut text = format!("🎯 Tracked item is on sale: {}\n", item.name);
                push_entry_details(&mut text, item);
                truncate_chars(text, MAX_MESSAGE_CHARS)
            }
        }
    }
}

fn render_summary(added_count: usize, preview: &[CatalogItem]) -> String {
    let noun = if added_count == 1 { "item" } else { "items" };
    let mut text = format!("🔥 {added_count} new discounted {noun} since the last check\n\n");

    let mut listed = 0usize;
    for item in preview {
        let mut entry = format!("🎮 {}\n", item.name);
        push_entry_details(&mut entry, item);
        entry.push('\n');
        if text.chars().count() + entry.chars().count() > MAX_MESSAGE_CHARS {
            break;
        }
        text.push_str(&entry);
        listed += 1;
    }

    let rest = added_count.saturating_sub(listed);
    if rest > 0 {
        let _ = write!(text, "…and {rest} more.");
    }
    truncate_chars(text.trim_end().to_string(), MAX_MESSAGE_CHARS)
}

fn push_entry_details(text: &mut String, item: &CatalogItem) {
    let _ = writeln!(
        text,
        "💸 {} → {}",
        item.price_original, item.price_discounted
    );
    let _ = writeln!(text, "🔗 {}", item.key);
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    text.chars().take(max).collect()
}
