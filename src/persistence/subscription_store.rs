//! SQLite tables for general and per-item subscriptions.
//!
//! Plain storage access only. Callers pass already-normalized names; the
//! [`crate::service::SubscriptionRegistry`] owns normalization and the
//! in-memory cache of general subscribers.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use super::models::ItemSubscription;
use crate::domain::RecipientId;
use crate::error::SentinelError;

/// Storage for both subscription tables.
#[derive(Debug, Clone)]
pub struct SubscriptionStore {
    pool: SqlitePool,
}

impl SubscriptionStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Loads every general subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn general_recipients(&self) -> Result<Vec<RecipientId>, SentinelError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT recipient_id FROM general_subscriptions ORDER BY recipient_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(RecipientId::new).collect())
    }

    /// Inserts a general subscription. Returns `false` if it already existed.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn insert_general(&self, recipient: RecipientId) -> Result<bool, SentinelError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO general_subscriptions (recipient_id, created_at) VALUES (?, ?)",
        )
        .bind(recipient.get())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Deletes a general subscription together with every per-item
    /// subscription of the same recipient, in one transaction.
    ///
    /// Returns `(general_removed, item_subscriptions_removed)`.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure; nothing is
    /// deleted in that case.
    pub async fn delete_recipient(
        &self,
        recipient: RecipientId,
    ) -> Result<(bool, u64), SentinelError> {
        let mut tx = self.pool.begin().await?;

        let items = sqlx::query("DELETE FROM item_subscriptions WHERE recipient_id = ?")
            .bind(recipient.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let general = sqlx::query("DELETE FROM general_subscriptions WHERE recipient_id = ?")
            .bind(recipient.get())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok((general == 1, items))
    }

    /// Inserts a per-item subscription. Returns `false` if the pair already
    /// existed, in which case nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn insert_item(
        &self,
        recipient: RecipientId,
        normalized_name: &str,
    ) -> Result<bool, SentinelError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO item_subscriptions (recipient_id, normalized_name, created_at) \
             VALUES (?, ?, ?)",
        )
        .bind(recipient.get())
        .bind(normalized_name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Deletes one per-item subscription. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn delete_item(
        &self,
        recipient: RecipientId,
        normalized_name: &str,
    ) -> Result<bool, SentinelError> {
        let result = sqlx::query(
            "DELETE FROM item_subscriptions WHERE recipient_id = ? AND normalized_name = ?",
        )
        .bind(recipient.get())
        .bind(normalized_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Lists the per-item subscriptions of one recipient, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn items_for(
        &self,
        recipient: RecipientId,
    ) -> Result<Vec<ItemSubscription>, SentinelError> {
        let rows = sqlx::query_as::<_, (i64, String, DateTime<Utc>)>(
            "SELECT recipient_id, normalized_name, created_at FROM item_subscriptions \
             WHERE recipient_id = ? ORDER BY created_at ASC, normalized_name ASC",
        )
        .bind(recipient.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ItemSubscription::from).collect())
    }

    /// Returns every recipient tracking exactly `normalized_name`.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn recipients_tracking<'e, E>(
        executor: E,
        normalized_name: &str,
    ) -> Result<Vec<RecipientId>, SentinelError>
    where
        E: SqliteExecutor<'e>,
    {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT recipient_id FROM item_subscriptions WHERE normalized_name = ? \
             ORDER BY recipient_id",
        )
        .bind(normalized_name)
        .fetch_all(executor)
        .await?;
        Ok(ids.into_iter().map(RecipientId::new).collect())
    }
}
