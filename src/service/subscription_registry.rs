//! Subscription registry with a write-through cache of general subscribers.
//!
//! The general set is small and read on every cycle, so it is cached in a
//! [`tokio::sync::RwLock`]. Mutations hold the write lock across the
//! storage write and the cache update, so readers see either the state
//! before a mutation or after it. Per-item subscriptions are unbounded and
//! rarely change relative to catalog cycles; they are read from storage
//! at match time.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqliteExecutor;
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::dispatch::AlertQueues;
use crate::domain::{RecipientId, normalize_name};
use crate::error::SentinelError;
use crate::persistence::SubscriptionStore;
use crate::persistence::models::ItemSubscription;

/// Result of a per-item subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSubscriptionOutcome {
    /// A new `(recipient, name)` pair was stored.
    Created,
    /// The pair already existed; nothing changed.
    AlreadyExists,
}

/// What an opt-out-all removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovalReport {
    /// Whether the recipient was a general subscriber.
    pub was_general: bool,
    /// Per-item subscriptions deleted.
    pub item_subscriptions: u64,
    /// Pending alerts purged from the recipient's queue.
    pub purged_alerts: usize,
}

/// Owner of general and per-item subscriptions.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    store: SubscriptionStore,
    general: RwLock<HashSet<RecipientId>>,
    queues: Arc<AlertQueues>,
}

impl SubscriptionRegistry {
    /// Builds the registry, loading the general subscriber cache from
    /// storage.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] if the subscriber table cannot be
    /// read.
    pub async fn load(
        store: SubscriptionStore,
        queues: Arc<AlertQueues>,
    ) -> Result<Self, SentinelError> {
        let general: HashSet<RecipientId> = store.general_recipients().await?.into_iter().collect();
        tracing::info!(general_subscribers = general.len(), "subscription cache loaded");
        Ok(Self {
            store,
            general: RwLock::new(general),
            queues,
        })
    }

    /// Opts a recipient into general alerts. Returns `false` if it already
    /// was a general subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure; the cache is
    /// left unchanged.
    pub async fn add_general(&self, recipient: RecipientId) -> Result<bool, SentinelError> {
        let mut general = self.general.write().await;
        let created = self.store.insert_general(recipient).await?;
        general.insert(recipient);
        if created {
            tracing::info!(%recipient, "general subscription added");
        }
        Ok(created)
    }

    /// Opts a recipient out of everything: the general subscription, all
    /// per-item subscriptions, and any pending alerts.
    ///
    /// Idempotent; removing an unknown recipient reports zeros.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure; the cache and
    /// the queue are left unchanged.
    pub async fn remove_general(
        &self,
        recipient: RecipientId,
    ) -> Result<RemovalReport, SentinelError> {
        let mut general = self.general.write().await;
        let (was_general, item_subscriptions) = self.store.delete_recipient(recipient).await?;
        general.remove(&recipient);
        let purged_alerts = self.queues.purge(recipient).await;
        drop(general);

        tracing::info!(
            %recipient,
            was_general,
            item_subscriptions,
            purged_alerts,
            "recipient unsubscribed"
        );
        Ok(RemovalReport {
            was_general,
            item_subscriptions,
            purged_alerts,
        })
    }

    /// Starts tracking a title for a recipient.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::InvalidRequest`] if the name is blank and
    /// [`SentinelError::Storage`] on database failure.
    pub async fn add_item_subscription(
        &self,
        recipient: RecipientId,
        raw_name: &str,
    ) -> Result<ItemSubscriptionOutcome, SentinelError> {
        let name = non_blank(raw_name)?;
        if self.store.insert_item(recipient, &name).await? {
            tracing::info!(%recipient, name, "item subscription added");
            Ok(ItemSubscriptionOutcome::Created)
        } else {
            Ok(ItemSubscriptionOutcome::AlreadyExists)
        }
    }

    /// Stops tracking a title. Returns `false` if it was not tracked.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::InvalidRequest`] if the name is blank and
    /// [`SentinelError::Storage`] on database failure.
    pub async fn remove_item_subscription(
        &self,
        recipient: RecipientId,
        raw_name: &str,
    ) -> Result<bool, SentinelError> {
        let name = non_blank(raw_name)?;
        self.store.delete_item(recipient, &name).await
    }

    /// Lists a recipient's tracked titles.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn item_subscriptions(
        &self,
        recipient: RecipientId,
    ) -> Result<Vec<ItemSubscription>, SentinelError> {
        self.store.items_for(recipient).await
    }

    /// Returns every recipient tracking exactly the normalized form of
    /// `name`. No substring or fuzzy matching.
    ///
    /// Reads through `executor`, so the lookup can run inside the catalog
    /// transaction that introduces the item.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn matches_on_arrival<'e, E>(
        executor: E,
        name: &str,
    ) -> Result<BTreeSet<RecipientId>, SentinelError>
    where
        E: SqliteExecutor<'e>,
    {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Ok(BTreeSet::new());
        }
        Ok(SubscriptionStore::recipients_tracking(executor, &normalized)
            .await?
            .into_iter()
            .collect())
    }

    /// Returns `true` if the recipient receives general alerts.
    pub async fn is_general(&self, recipient: RecipientId) -> bool {
        self.general.read().await.contains(&recipient)
    }

    /// Number of general subscribers.
    pub async fn general_count(&self) -> usize {
        self.general.read().await.len()
    }

    /// Read guard over the general subscriber set.
    ///
    /// While the guard is held, no subscription can be added or removed.
    /// Alert fan-out holds it so that an opt-out either precedes the
    /// fan-out entirely or purges what it enqueued.
    pub async fn general_recipients(&self) -> RwLockReadGuard<'_, HashSet<RecipientId>> {
        self.general.read().await
    }
}

fn non_blank(raw_name: &str) -> Result<String, SentinelError> {
    let name = normalize_name(raw_name);
    if name.is_empty() {
        return Err(SentinelError::InvalidRequest(
            "item name must not be blank".to_string(),
        ));
    }
    Ok(name)
}
