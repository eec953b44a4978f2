//! SQLite-backed catalog with atomic replace-and-diff.
//!
//! Replacement is two-step: [`CatalogStore::stage`] writes the snapshot in
//! an open transaction, [`StagedReplace::commit`] publishes it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use super::models::{CATALOG_COLUMNS, CatalogRow, catalog_item_from_row};
use crate::domain::{CatalogItem, DiffResult, RawSnapshot, normalize_name};
use crate::error::SentinelError;

/// A catalog replacement written but not yet committed.
///
/// Holds the open transaction so that work which must succeed together
/// with the replacement can read through
/// [`diff_and_connection`](Self::diff_and_connection) before
/// [`commit`](Self::commit).
pub struct StagedReplace {
    tx: Transaction<'static, Sqlite>,
    diff: DiffResult,
}

impl StagedReplace {
    /// The diff the replacement will produce once committed.
    #[must_use]
    pub fn diff(&self) -> &DiffResult {
        &self.diff
    }

    /// The pending diff together with the connection of the open
    /// transaction.
    pub fn diff_and_connection(&mut self) -> (&DiffResult, &mut SqliteConnection) {
        (&self.diff, &mut *self.tx)
    }

    /// Commits the replacement and returns its diff.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] if the commit fails; the previous
    /// catalog is left intact.
    pub async fn commit(self) -> Result<DiffResult, SentinelError> {
        self.tx.commit().await?;
        let diff = self.diff;
        tracing::info!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            updated = diff.updated.len(),
            cold_start = diff.is_cold_start,
            "catalog replaced"
        );
        Ok(diff)
    }
}

impl std::fmt::Debug for StagedReplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedReplace")
            .field("diff", &self.diff)
            .finish_non_exhaustive()
    }
}

/// Persisted catalog of currently-discounted items.
///
/// The sync loop is the only writer and always goes through
/// [`CatalogStore::replace_and_diff`]; the request surface only reads.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Applies an accepted snapshot and returns how it differs from the
    /// previous catalog. Equivalent to [`stage`](Self::stage) followed by
    /// [`StagedReplace::commit`].
    ///
    /// # Errors
    ///
    /// See [`stage`](Self::stage); a failed commit is
    /// [`SentinelError::Storage`] and leaves the previous catalog intact.
    pub async fn replace_and_diff(
        &self,
        snapshot: &RawSnapshot,
    ) -> Result<DiffResult, SentinelError> {
        self.stage(snapshot).await?.commit().await
    }

    /// Writes a snapshot inside an open transaction and computes the diff,
    /// without committing.
    ///
    /// Unseen keys are inserted, known keys get refreshed prices, position
    /// and `last_seen_at`, and keys missing from the snapshot are deleted.
    /// When the key is repeated inside the snapshot, the first occurrence
    /// wins. Records with a blank key are skipped. Dropping the returned
    /// [`StagedReplace`] rolls everything back.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::AcquisitionFailure`] if the snapshot holds
    /// no usable record (the catalog is never emptied by a snapshot), and
    /// [`SentinelError::Storage`] on any database failure.
    pub async fn stage(&self, snapshot: &RawSnapshot) -> Result<StagedReplace, SentinelError> {
        let mut tx = self.pool.begin().await?;

        let previous: HashSet<String> = sqlx::query_scalar::<_, String>("SELECT key FROM catalog")
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();
        let is_cold_start = previous.is_empty();

        let mut seen: HashSet<String> = HashSet::with_capacity(snapshot.items.len());
        let mut added = Vec::new();
        let mut updated = Vec::new();
        let mut position: i64 = 0;

        for raw in &snapshot.items {
            let item = raw.to_catalog_item(snapshot.captured_at);
            if item.key.is_empty() {
                tracing::debug!(name = %item.name, "skipping record without key");
                continue;
            }
            if !seen.insert(item.key.clone()) {
                tracing::debug!(key = %item.key, "duplicate key in snapshot, keeping first");
                continue;
            }

            upsert(&mut tx, &item, position, snapshot.captured_at).await?;
            position += 1;

            if previous.contains(&item.key) {
                updated.push(item);
            } else {
                added.push(item);
            }
        }

        if seen.is_empty() {
            return Err(SentinelError::AcquisitionFailure(
                "snapshot has no usable records".to_string(),
            ));
        }

        let mut removed: Vec<String> = previous
            .into_iter()
            .filter(|key| !seen.contains(key))
            .collect();
        removed.sort();

        for key in &removed {
            sqlx::query("DELETE FROM catalog WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        Ok(StagedReplace {
            tx,
            diff: DiffResult {
                added,
                removed,
                updated,
                is_cold_start,
            },
        })
    }

    /// Returns the number of catalog rows.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn count(&self) -> Result<u64, SentinelError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM catalog")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Returns one page of the catalog in source order.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn page(&self, offset: u32, limit: u32) -> Result<Vec<CatalogItem>, SentinelError> {
        let rows = sqlx::query_as::<_, CatalogRow>(&format!(
            "SELECT {CATALOG_COLUMNS} FROM catalog ORDER BY position ASC, key ASC LIMIT ? OFFSET ?"
        ))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(catalog_item_from_row).collect())
    }

    /// Returns catalog items whose normalized title equals `name` after
    /// normalization.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] on database failure.
    pub async fn find_on_sale(&self, name: &str) -> Result<Vec<CatalogItem>, SentinelError> {
        let rows = sqlx::query_as::<_, CatalogRow>(&format!(
            "SELECT {CATALOG_COLUMNS} FROM catalog WHERE normalized_name = ? ORDER BY position ASC"
        ))
        .bind(normalize_name(name))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(catalog_item_from_row).collect())
    }
}

async fn upsert(
    conn: &mut SqliteConnection,
    item: &CatalogItem,
    position: i64,
    seen_at: DateTime<Utc>,
) -> Result<(), SentinelError> {
    sqlx::query(
        "INSERT INTO catalog \
         (key, name, normalized_name, price_original, price_discounted, position, first_seen_at, last_seen_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET \
         name = excluded.name, \
         normalized_name = excluded.normalized_name, \
         price_original = excluded.price_original, \
         price_discounted = excluded.price_discounted, \
         position = excluded.position, \
         last_seen_at = excluded.last_seen_at",
    )
    .bind(&item.key)
    .bind(&item.name)
    .bind(item.normalized_name())
    .bind(&item.price_original)
    .bind(&item.price_discounted)
    .bind(position)
    .bind(seen_at)
    .bind(seen_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::RawItem;
    use crate::persistence::open_in_memory;

    async fn store() -> CatalogStore {
        let Ok(pool) = open_in_memory().await else {
            panic!("in-memory database");
        };
        CatalogStore::new(pool)
    }

    fn snapshot(keys: &[&str]) -> RawSnapshot {
        let items = keys
            .iter()
            .map(|k| RawItem::new(format!("Game {k}"), *k).with_prices("$10", "$5"))
            .collect();
        RawSnapshot::new(items, 0)
    }

    async fn row(store: &CatalogStore, key: &str) -> Option<CatalogItem> {
        store
            .page(0, 100)
            .await
            .ok()?
            .into_iter()
            .find(|item| item.key == key)
    }

    fn keys(items: &[CatalogItem]) -> Vec<&str> {
        let mut out: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        out.sort_unstable();
        out
    }

    #[tokio::test]
    async fn first_snapshot_is_cold_start() {
        let store = store().await;
        let Ok(diff) = store.replace_and_diff(&snapshot(&["a", "b", "c"])).await else {
            panic!("apply failed");
        };
        assert!(diff.is_cold_start);
        assert_eq!(keys(&diff.added), vec!["a", "b", "c"]);
        assert!(diff.removed.is_empty());
        assert!(diff.updated.is_empty());
        assert_eq!(store.count().await.ok(), Some(3));
    }

    #[tokio::test]
    async fn reapplying_same_snapshot_is_idempotent() {
        let store = store().await;
        let snap = snapshot(&["a", "b", "c"]);
        let _ = store.replace_and_diff(&snap).await;
        let Ok(diff) = store.replace_and_diff(&snap).await else {
            panic!("apply failed");
        };
        assert!(!diff.is_cold_start);
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert_eq!(keys(&diff.updated), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn partition_reports_added_removed_updated() {
        let store = store().await;
        let _ = store.replace_and_diff(&snapshot(&["A", "B", "C"])).await;
        let Ok(diff) = store.replace_and_diff(&snapshot(&["A", "C", "D"])).await else {
            panic!("apply failed");
        };
        assert_eq!(keys(&diff.added), vec!["D"]);
        assert_eq!(diff.removed, vec!["B".to_string()]);
        assert_eq!(keys(&diff.updated), vec!["A", "C"]);

        assert!(row(&store, "B").await.is_none());
        assert!(row(&store, "D").await.is_some());
        assert_eq!(store.count().await.ok(), Some(3));
    }

    #[tokio::test]
    async fn updated_rows_get_fresh_prices() {
        let store = store().await;
        let _ = store.replace_and_diff(&snapshot(&["a"])).await;

        let refreshed = RawSnapshot::new(
            vec![RawItem::new("Game a", "a").with_prices("$10", "$2.50")],
            0,
        );
        let _ = store.replace_and_diff(&refreshed).await;

        let Some(item) = row(&store, "a").await else {
            panic!("row missing");
        };
        assert_eq!(item.price_discounted, "$2.50");
        assert_eq!(item.last_seen_at, refreshed.captured_at);
    }

    #[tokio::test]
    async fn duplicate_keys_keep_first_occurrence() {
        let store = store().await;
        let snap = RawSnapshot::new(
            vec![
                RawItem::new("First", "dup"),
                RawItem::new("Second", "dup"),
                RawItem::new("Other", "x"),
            ],
            0,
        );
        let Ok(diff) = store.replace_and_diff(&snap).await else {
            panic!("apply failed");
        };
        assert_eq!(diff.added.len(), 2);
        let Some(item) = row(&store, "dup").await else {
            panic!("row missing");
        };
        assert_eq!(item.name, "First");
    }

    #[tokio::test]
    async fn page_follows_latest_source_order() {
        let store = store().await;
        let _ = store.replace_and_diff(&snapshot(&["c", "a", "b"])).await;
        let Ok(page) = store.page(0, 2).await else {
            panic!("page failed");
        };
        let order: Vec<&str> = page.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(order, vec!["c", "a"]);

        let Ok(rest) = store.page(2, 50).await else {
            panic!("page failed");
        };
        assert_eq!(rest.len(), 1);
        assert!(store.page(3, 50).await.ok().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn find_on_sale_matches_normalized_title_exactly() {
        let store = store().await;
        let snap = RawSnapshot::new(
            vec![
                RawItem::new("DOOM Eternal", "k1"),
                RawItem::new("Doom", "k2"),
            ],
            0,
        );
        let _ = store.replace_and_diff(&snap).await;

        let Ok(found) = store.find_on_sale("  doom eternal ").await else {
            panic!("lookup failed");
        };
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().map(|i| i.key.as_str()), Some("k1"));
        assert!(store.find_on_sale("eternal").await.ok().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn snapshot_without_usable_keys_leaves_catalog_intact() {
        let store = store().await;
        let _ = store.replace_and_diff(&snapshot(&["a", "b"])).await;

        assert!(matches!(
            store.replace_and_diff(&snapshot(&[])).await,
            Err(SentinelError::AcquisitionFailure(_))
        ));
        assert!(matches!(
            store.replace_and_diff(&snapshot(&["  ", ""])).await,
            Err(SentinelError::AcquisitionFailure(_))
        ));
        assert_eq!(store.count().await.ok(), Some(2));

        let Ok(diff) = store.replace_and_diff(&snapshot(&["a", "b", "c"])).await else {
            panic!("apply failed");
        };
        assert!(!diff.is_cold_start);
        assert_eq!(keys(&diff.added), vec!["c"]);
    }

    #[tokio::test]
    async fn dropped_stage_rolls_back() {
        let store = store().await;
        let _ = store.replace_and_diff(&snapshot(&["a"])).await;

        let Ok(staged) = store.stage(&snapshot(&["b", "c"])).await else {
            panic!("stage failed");
        };
        assert_eq!(keys(&staged.diff().added), vec!["b", "c"]);
        assert_eq!(staged.diff().removed, vec!["a".to_string()]);
        drop(staged);

        assert_eq!(store.count().await.ok(), Some(1));
        assert!(row(&store, "a").await.is_some());
    }
}
