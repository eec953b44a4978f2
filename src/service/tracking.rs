//! Subscribe-time handling of per-item tracking requests.

use std::sync::Arc;

use serde::Serialize;

use super::subscription_registry::{ItemSubscriptionOutcome, SubscriptionRegistry};
use crate::domain::{CatalogItem, RecipientId, normalize_name};
use crate::error::SentinelError;
use crate::persistence::CatalogStore;

/// Answer to a tracking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrackOutcome {
    /// The title is not on sale; the recipient will be alerted on arrival.
    Created {
        /// Normalized title that will be matched.
        normalized_name: String,
    },
    /// The title is already in the catalog. No subscription is created.
    AlreadyOnSale {
        /// Matching catalog entries.
        items: Vec<CatalogItem>,
    },
}

/// Combines the catalog and the registry for tracking requests.
#[derive(Debug, Clone)]
pub struct TrackingService {
    catalog: CatalogStore,
    registry: Arc<SubscriptionRegistry>,
}

impl TrackingService {
    /// Creates the service.
    #[must_use]
    pub fn new(catalog: CatalogStore, registry: Arc<SubscriptionRegistry>) -> Self {
        Self { catalog, registry }
    }

    /// Tracks `raw_name` for `recipient`, or reports it as already on sale.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::InvalidRequest`] for a blank name,
    /// [`SentinelError::DuplicateSubscription`] if the recipient already
    /// tracks the title, and [`SentinelError::Storage`] on database failure.
    pub async fn track(
        &self,
        recipient: RecipientId,
        raw_name: &str,
    ) -> Result<TrackOutcome, SentinelError> {
        let normalized_name = normalize_name(raw_name);
        if normalized_name.is_empty() {
            return Err(SentinelError::InvalidRequest(
                "item name must not be blank".to_string(),
            ));
        }

        // Subscribe before reading the catalog: a sync committing the title
        // concurrently either sees this subscription or is seen below.
        let outcome = self
            .registry
            .add_item_subscription(recipient, &normalized_name)
            .await?;

        let on_sale = self.catalog.find_on_sale(&normalized_name).await?;
        if !on_sale.is_empty() {
            if outcome == ItemSubscriptionOutcome::Created {
                self.registry
                    .remove_item_subscription(recipient, &normalized_name)
                    .await?;
            }
            tracing::debug!(%recipient, name = %normalized_name, "tracked title already on sale");
            return Ok(TrackOutcome::AlreadyOnSale { items: on_sale });
        }

        match outcome {
            ItemSubscriptionOutcome::Created => Ok(TrackOutcome::Created { normalized_name }),
            ItemSubscriptionOutcome::AlreadyExists => Err(SentinelError::DuplicateSubscription {
                recipient,
                name: normalized_name,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::dispatch::AlertQueues;
    use crate::domain::{RawItem, RawSnapshot};
    use crate::persistence::{SubscriptionStore, open_in_memory};

    async fn service() -> (TrackingService, CatalogStore, Arc<SubscriptionRegistry>) {
        let Ok(pool) = open_in_memory().await else {
            panic!("in-memory database");
        };
        let catalog = CatalogStore::new(pool.clone());
        let Ok(registry) = SubscriptionRegistry::load(
            SubscriptionStore::new(pool),
            Arc::new(AlertQueues::new()),
        )
        .await
        else {
            panic!("registry load failed");
        };
        let registry = Arc::new(registry);
        (
            TrackingService::new(catalog.clone(), Arc::clone(&registry)),
            catalog,
            registry,
        )
    }

    #[tokio::test]
    async fn not_on_sale_creates_subscription() {
        let (svc, _, registry) = service().await;
        let r = RecipientId::new(1);
        let Ok(outcome) = svc.track(r, " Hades ").await else {
            panic!("track failed");
        };
        assert_eq!(
            outcome,
            TrackOutcome::Created {
                normalized_name: "hades".to_string()
            }
        );
        assert_eq!(registry.item_subscriptions(r).await.ok().map(|s| s.len()), Some(1));
    }

    #[tokio::test]
    async fn duplicate_request_is_reported() {
        let (svc, _, _) = service().await;
        let r = RecipientId::new(1);
        let _ = svc.track(r, "Hades").await;
        assert!(matches!(
            svc.track(r, "HADES").await,
            Err(SentinelError::DuplicateSubscription { .. })
        ));
    }

    #[tokio::test]
    async fn already_on_sale_answers_immediately_without_subscribing() {
        let (svc, catalog, registry) = service().await;
        let _ = catalog
            .replace_and_diff(&RawSnapshot::new(vec![RawItem::new("Hades", "k1")], 0))
            .await;

        let r = RecipientId::new(1);
        let Ok(TrackOutcome::AlreadyOnSale { items }) = svc.track(r, "hades").await else {
            panic!("expected already-on-sale");
        };
        assert_eq!(items.len(), 1);
        assert!(registry.item_subscriptions(r).await.ok().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn earlier_subscription_survives_when_title_goes_on_sale() {
        let (svc, catalog, registry) = service().await;
        let r = RecipientId::new(1);
        let _ = svc.track(r, "Hades").await;
        let _ = catalog
            .replace_and_diff(&RawSnapshot::new(vec![RawItem::new("Hades", "k1")], 0))
            .await;

        assert!(matches!(
            svc.track(r, "hades").await,
            Ok(TrackOutcome::AlreadyOnSale { .. })
        ));
        assert_eq!(registry.item_subscriptions(r).await.ok().map(|s| s.len()), Some(1));
    }

    #[tokio::test]
    async fn blank_name_is_invalid() {
        let (svc, _, _) = service().await;
        assert!(matches!(
            svc.track(RecipientId::new(1), "\t").await,
            Err(SentinelError::InvalidRequest(_))
        ));
    }
}
