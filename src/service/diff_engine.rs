//! Turns catalog diffs into queued alerts.
//!
//! General subscribers get one summary per cycle; targeted subscribers get
//! one alert per matching added item. The two channels are independent, so
//! a recipient may receive both in the same cycle.
//!
//! Fan-out is split in two. [`DiffEngine::plan`] resolves targeted matches
//! through the connection of the still-open catalog transaction, so a
//! failed lookup rolls the catalog back and the next cycle sees the same
//! additions again. [`DiffEngine::dispatch`] runs after commit and cannot
//! fail.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::dispatch::AlertQueues;
use crate::domain::{CatalogItem, DiffResult, PendingAlert, RecipientId};
use crate::error::SentinelError;
use crate::service::SubscriptionRegistry;

/// Counts of alerts produced for one diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    /// The diff was a cold start and produced nothing.
    pub suppressed_cold_start: bool,
    /// Summary alerts enqueued (one per general subscriber).
    pub general_alerts: usize,
    /// Targeted alerts enqueued.
    pub targeted_alerts: usize,
}

/// Alerts a diff calls for, resolved but not yet enqueued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutPlan {
    suppressed_cold_start: bool,
    added: Vec<CatalogItem>,
    targeted: Vec<(CatalogItem, BTreeSet<RecipientId>)>,
}

impl FanOutPlan {
    /// Returns `true` if dispatching the plan enqueues nothing for anyone.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
    }

    /// Number of targeted alerts the plan will enqueue.
    #[must_use]
    pub fn targeted_count(&self) -> usize {
        self.targeted.iter().map(|(_, recipients)| recipients.len()).sum()
    }
}

/// Cross-references diffs with the subscription registry.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    registry: Arc<SubscriptionRegistry>,
    queues: Arc<AlertQueues>,
    remove_tracked_on_arrival: bool,
}

impl DiffEngine {
    /// Creates an engine feeding the given queues.
    ///
    /// With `remove_tracked_on_arrival`, a per-item subscription is
    /// deleted once it has produced its alert.
    #[must_use]
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        queues: Arc<AlertQueues>,
        remove_tracked_on_arrival: bool,
    ) -> Self {
        Self {
            registry,
            queues,
            remove_tracked_on_arrival,
        }
    }

    /// Resolves the targeted recipients for every added item.
    ///
    /// Diffs that are not alert-worthy (cold start, no additions) plan
    /// nothing and touch no storage.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Storage`] if per-item subscriptions cannot
    /// be read.
    pub async fn plan(
        &self,
        diff: &DiffResult,
        conn: &mut SqliteConnection,
    ) -> Result<FanOutPlan, SentinelError> {
        if !diff.is_alert_worthy() {
            if diff.is_cold_start {
                tracing::info!(added = diff.added.len(), "cold start, alerts suppressed");
            }
            return Ok(FanOutPlan {
                suppressed_cold_start: diff.is_cold_start,
                ..FanOutPlan::default()
            });
        }

        let mut targeted = Vec::new();
        for item in &diff.added {
            let recipients = SubscriptionRegistry::matches_on_arrival(&mut *conn, &item.name).await?;
            if !recipients.is_empty() {
                targeted.push((item.clone(), recipients));
            }
        }

        Ok(FanOutPlan {
            suppressed_cold_start: false,
            added: diff.added.clone(),
            targeted,
        })
    }

    /// Enqueues a plan: one summary per current general subscriber, then
    /// the targeted alerts. Matched per-item subscriptions are retired
    /// afterwards when configured to.
    pub async fn dispatch(&self, plan: &FanOutPlan) -> FanOutReport {
        let mut report = FanOutReport {
            suppressed_cold_start: plan.suppressed_cold_start,
            ..FanOutReport::default()
        };
        if plan.is_empty() {
            return report;
        }

        // Held until every alert is enqueued; see `general_recipients`.
        let general = self.registry.general_recipients().await;

        let mut general_sorted: Vec<RecipientId> = general.iter().copied().collect();
        general_sorted.sort_unstable();
        for recipient in general_sorted {
            self.queues
                .enqueue(recipient, PendingAlert::summary(&plan.added))
                .await;
            report.general_alerts += 1;
        }

        for (item, recipients) in &plan.targeted {
            for recipient in recipients {
                self.queues
                    .enqueue(*recipient, PendingAlert::tracked(item.clone()))
                    .await;
                report.targeted_alerts += 1;
            }
        }
        drop(general);

        if self.remove_tracked_on_arrival {
            for (item, recipients) in &plan.targeted {
                for recipient in recipients {
                    if let Err(err) = self
                        .registry
                        .remove_item_subscription(*recipient, &item.name)
                        .await
                    {
                        tracing::warn!(%recipient, name = %item.name, error = %err, "failed to retire item subscription");
                    }
                }
            }
        }

        tracing::info!(
            added = plan.added.len(),
            general_alerts = report.general_alerts,
            targeted_alerts = report.targeted_alerts,
            "alerts enqueued"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::AlertPayload;
    use crate::persistence::{SubscriptionStore, open_in_memory};
    use chrono::Utc;
    use sqlx::SqlitePool;

    struct Fixture {
        engine: DiffEngine,
        pool: SqlitePool,
    }

    impl Fixture {
        async fn fan_out(&self, diff: &DiffResult) -> Result<FanOutReport, SentinelError> {
            let mut conn = self.pool.acquire().await?;
            let plan = self.engine.plan(diff, &mut conn).await?;
            drop(conn);
            Ok(self.engine.dispatch(&plan).await)
        }
    }

    async fn engine(remove_on_arrival: bool) -> (Fixture, Arc<SubscriptionRegistry>, Arc<AlertQueues>) {
        let Ok(pool) = open_in_memory().await else {
            panic!("in-memory database");
        };
        let queues = Arc::new(AlertQueues::new());
        let Ok(registry) =
            SubscriptionRegistry::load(SubscriptionStore::new(pool.clone()), Arc::clone(&queues))
                .await
        else {
            panic!("registry load failed");
        };
        let registry = Arc::new(registry);
        let engine = DiffEngine::new(Arc::clone(&registry), Arc::clone(&queues), remove_on_arrival);
        (Fixture { engine, pool }, registry, queues)
    }

    fn item(name: &str) -> CatalogItem {
        CatalogItem {
            key: format!("https://store.example/{name}"),
            name: name.to_string(),
            price_original: "$30".to_string(),
            price_discounted: "$10".to_string(),
            last_seen_at: Utc::now(),
        }
    }

    fn warm_diff(names: &[&str]) -> DiffResult {
        DiffResult {
            added: names.iter().map(|n| item(n)).collect(),
            ..DiffResult::default()
        }
    }

    #[tokio::test]
    async fn cold_start_suppresses_everything() {
        let (engine, registry, queues) = engine(true).await;
        let _ = registry.add_general(RecipientId::new(1)).await;
        let _ = registry.add_item_subscription(RecipientId::new(2), "Hades").await;

        let diff = DiffResult {
            is_cold_start: true,
            ..warm_diff(&["Hades", "Celeste"])
        };
        let Ok(report) = engine.fan_out(&diff).await else {
            panic!("fan out failed");
        };
        assert!(report.suppressed_cold_start);
        assert_eq!(report.general_alerts + report.targeted_alerts, 0);
        assert!(queues.is_empty().await);
    }

    #[tokio::test]
    async fn general_subscribers_get_one_summary_per_cycle() {
        let (engine, registry, queues) = engine(true).await;
        let _ = registry.add_general(RecipientId::new(1)).await;
        let _ = registry.add_general(RecipientId::new(2)).await;

        let Ok(report) = engine.fan_out(&warm_diff(&["A", "B", "C"])).await else {
            panic!("fan out failed");
        };
        assert_eq!(report.general_alerts, 2);
        assert_eq!(report.targeted_alerts, 0);
        assert_eq!(queues.len(RecipientId::new(1)).await, 1);

        let batch = queues.pop_front_each().await;
        let Some((_, first)) = batch.first() else {
            panic!("expected alert");
        };
        assert!(matches!(
            first.payload,
            AlertPayload::Summary { added_count: 3, .. }
        ));
    }

    #[tokio::test]
    async fn targeted_match_is_exact_and_independent_of_general() {
        let (engine, registry, queues) = engine(false).await;
        let both = RecipientId::new(1);
        let doom_only = RecipientId::new(2);
        let _ = registry.add_general(both).await;
        let _ = registry.add_item_subscription(both, "Hades").await;
        let _ = registry.add_item_subscription(doom_only, "doom eternal").await;

        let Ok(report) = engine.fan_out(&warm_diff(&["Hades", "Doom"])).await else {
            panic!("fan out failed");
        };
        assert_eq!(report.general_alerts, 1);
        assert_eq!(report.targeted_alerts, 1);
        assert_eq!(queues.len(both).await, 2);
        assert_eq!(queues.len(doom_only).await, 0);
    }

    #[tokio::test]
    async fn items_without_subscribers_produce_nothing() {
        let (engine, _, queues) = engine(true).await;
        let Ok(report) = engine.fan_out(&warm_diff(&["Nobody Wants This"])).await else {
            panic!("fan out failed");
        };
        assert_eq!(report, FanOutReport::default());
        assert!(queues.is_empty().await);
    }

    #[tokio::test]
    async fn tracked_subscription_retires_after_arrival() {
        let (engine, registry, _) = engine(true).await;
        let r = RecipientId::new(3);
        let _ = registry.add_item_subscription(r, "Hades").await;

        let _ = engine.fan_out(&warm_diff(&["Hades"])).await;
        assert!(registry.item_subscriptions(r).await.ok().unwrap_or_default().is_empty());

        let Ok(again) = engine.fan_out(&warm_diff(&["Hades"])).await else {
            panic!("fan out failed");
        };
        assert_eq!(again.targeted_alerts, 0);
    }

    #[tokio::test]
    async fn tracked_subscription_survives_when_retention_enabled() {
        let (engine, registry, _) = engine(false).await;
        let r = RecipientId::new(3);
        let _ = registry.add_item_subscription(r, "Hades").await;
        let _ = engine.fan_out(&warm_diff(&["Hades"])).await;
        assert_eq!(registry.item_subscriptions(r).await.ok().map(|s| s.len()), Some(1));
    }

    #[tokio::test]
    async fn failed_lookup_plans_nothing() {
        let (fixture, registry, queues) = engine(true).await;
        let _ = registry.add_general(RecipientId::new(1)).await;
        let _ = sqlx::query("DROP TABLE item_subscriptions")
            .execute(&fixture.pool)
            .await;

        assert!(matches!(
            fixture.fan_out(&warm_diff(&["Hades"])).await,
            Err(SentinelError::Storage(_))
        ));
        assert!(queues.is_empty().await);
    }

    #[tokio::test]
    async fn opt_out_between_plan_and_dispatch_is_honored() {
        let (fixture, registry, queues) = engine(true).await;
        let r = RecipientId::new(5);
        let _ = registry.add_general(r).await;

        let Ok(mut conn) = fixture.pool.acquire().await else {
            panic!("connection");
        };
        let Ok(plan) = fixture.engine.plan(&warm_diff(&["Celeste"]), &mut conn).await else {
            panic!("plan failed");
        };
        drop(conn);
        assert_eq!(plan.targeted_count(), 0);

        let _ = registry.remove_general(r).await;
        let report = fixture.engine.dispatch(&plan).await;
        assert_eq!(report.general_alerts, 0);
        assert!(queues.is_empty().await);
    }

    #[tokio::test]
    async fn unsubscribed_recipient_gets_nothing_later() {
        let (engine, registry, queues) = engine(false).await;
        let r = RecipientId::new(9);
        let _ = registry.add_general(r).await;
        let _ = registry.add_item_subscription(r, "Hades").await;
        let _ = engine.fan_out(&warm_diff(&["Celeste"])).await;
        assert_eq!(queues.len(r).await, 1);

        let _ = registry.remove_general(r).await;
        assert_eq!(queues.len(r).await, 0);

        let Ok(report) = engine.fan_out(&warm_diff(&["Hades", "Other"])).await else {
            panic!("fan out failed");
        };
        assert_eq!(report, FanOutReport::default());
        assert_eq!(queues.len(r).await, 0);
    }
}
