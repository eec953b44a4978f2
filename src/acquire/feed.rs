//! HTTP JSON feed acquirer.
//!
//! Reads a snapshot published by an external scraper as
//!
//! ```json
//! {
//!   "total": 412,
//!   "items": [
//!     { "name": "Hades", "key": "https://store.example/app/1145360",
//!       "price_original": "$24.99", "price_discounted": "$9.99" }
//!   ]
//! }
//! ```
//!
//! `total` and both prices are optional.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use super::Acquirer;
use crate::domain::{RawItem, RawSnapshot};
use crate::error::SentinelError;

/// Feed document as published by the scraper.
#[derive(Debug, Deserialize)]
struct FeedDocument {
    #[serde(default)]
    total: Option<u64>,
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    name: String,
    #[serde(alias = "link", alias = "url")]
    key: String,
    #[serde(default)]
    price_original: Option<String>,
    #[serde(default)]
    price_discounted: Option<String>,
}

impl From<FeedDocument> for RawSnapshot {
    fn from(doc: FeedDocument) -> Self {
        let items = doc
            .items
            .into_iter()
            .map(|item| RawItem {
                name: item.name,
                key: item.key,
                price_original: item.price_original,
                price_discounted: item.price_discounted,
            })
            .collect();
        Self {
            items,
            captured_at: Utc::now(),
            reported_total: doc.total.unwrap_or(0),
        }
    }
}

/// Fetches snapshots from a JSON feed over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedAcquirer {
    client: reqwest::Client,
    url: String,
}

impl HttpFeedAcquirer {
    /// Creates an acquirer for `url`; every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Config`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SentinelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SentinelError::Config(format!("feed client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Acquirer for HttpFeedAcquirer {
    async fn acquire(&self) -> Result<RawSnapshot, SentinelError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| SentinelError::AcquisitionFailure(e.to_string()))?;

        let doc: FeedDocument = response
            .json()
            .await
            .map_err(|e| SentinelError::AcquisitionFailure(format!("malformed feed: {e}")))?;

        let snapshot = RawSnapshot::from(doc);
        tracing::debug!(
            url = %self.url,
            observed = snapshot.observed(),
            reported_total = snapshot.reported_total,
            "feed fetched"
        );
        Ok(snapshot)
    }
}
