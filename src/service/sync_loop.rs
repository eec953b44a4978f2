//! Synchronization loop: acquire, validate, apply, fan out, sleep.
//!
//! A single sequential worker. Completed cycles (including ones with no
//! additions) sleep for the normal interval; acquisition failures,
//! rejected snapshots and storage errors sleep for the short retry
//! interval. Both sleeps end early when the stop signal flips.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{self, Instant};

use super::diff_engine::DiffEngine;
use crate::acquire::Acquirer;
use crate::domain::CompletenessValidator;
use crate::error::SentinelError;
use crate::persistence::CatalogStore;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Not started yet.
    #[default]
    Idle,
    /// Waiting on the acquirer.
    Acquiring,
    /// Checking completeness.
    Validating,
    /// Writing the catalog transaction.
    Applying,
    /// Matching additions against subscriptions and enqueuing alerts.
    Dispatching,
    /// Waiting for the next cycle.
    Sleeping,
    /// Stopped by the shutdown signal.
    Stopped,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// Items new to the catalog.
    pub added: usize,
    /// Items that left the catalog.
    pub removed: usize,
    /// Items re-observed.
    pub updated: usize,
    /// The previous catalog was empty.
    pub cold_start: bool,
    /// Catalog rows after the cycle.
    pub catalog_size: usize,
    /// Summary alerts enqueued.
    pub general_alerts: usize,
    /// Targeted alerts enqueued.
    pub targeted_alerts: usize,
}

/// Observable loop state, published on a `watch` channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// Current phase.
    pub phase: SyncPhase,
    /// Cycles that completed since start.
    pub cycles_completed: u64,
    /// Failed cycles since the last completed one.
    pub consecutive_failures: u32,
    /// End of the last completed cycle.
    pub last_completed_at: Option<DateTime<Utc>>,
    /// Outcome of the last completed cycle.
    pub last_cycle: Option<CycleSummary>,
    /// Message of the last failure, cleared on success.
    pub last_error: Option<String>,
    /// When the next cycle is due.
    pub next_cycle_at: Option<DateTime<Utc>>,
}

/// Sleep intervals between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSchedule {
    /// After a completed cycle.
    pub normal_interval: Duration,
    /// After a failed or rejected cycle.
    pub retry_interval: Duration,
}

impl Default for SyncSchedule {
    fn default() -> Self {
        Self {
            normal_interval: Duration::from_secs(1800),
            retry_interval: Duration::from_secs(60),
        }
    }
}

/// The synchronization worker.
#[derive(Debug)]
pub struct SyncLoop<A> {
    acquirer: A,
    validator: CompletenessValidator,
    catalog: CatalogStore,
    engine: DiffEngine,
    schedule: SyncSchedule,
    status: watch::Sender<SyncStatus>,
}

impl<A: Acquirer> SyncLoop<A> {
    /// Wires the loop's collaborators.
    #[must_use]
    pub fn new(
        acquirer: A,
        validator: CompletenessValidator,
        catalog: CatalogStore,
        engine: DiffEngine,
        schedule: SyncSchedule,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            acquirer,
            validator,
            catalog,
            engine,
            schedule,
            status,
        }
    }

    /// Returns a receiver for status updates.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.status.send_modify(|s| s.phase = phase);
    }

    /// Runs one full cycle without sleeping.
    ///
    /// Records with blank or repeated keys are discarded before the
    /// emptiness check and the completeness gate, so both judge the records
    /// that would actually be stored. Targeted matches are resolved inside
    /// the catalog transaction; alerts are enqueued only after it commits.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::AcquisitionFailure`] when no snapshot, or
    /// one without usable records, was acquired,
    /// [`SentinelError::IncompleteScrape`] when the snapshot was rejected,
    /// and [`SentinelError::Storage`] when the catalog or the subscription
    /// tables could not be accessed. The catalog is unchanged in every
    /// error case.
    pub async fn run_cycle(&self) -> Result<CycleSummary, SentinelError> {
        self.set_phase(SyncPhase::Acquiring);
        let raw = self.acquirer.acquire().await?;
        let raw_count = raw.observed();
        let snapshot = raw.into_usable();
        if snapshot.is_empty() {
            return Err(SentinelError::AcquisitionFailure(format!(
                "snapshot contained no usable items ({raw_count} raw records)"
            )));
        }
        tracing::info!(
            observed = snapshot.observed(),
            discarded = raw_count - snapshot.observed(),
            reported_total = snapshot.reported_total,
            "snapshot acquired"
        );

        self.set_phase(SyncPhase::Validating);
        self.validator.validate(&snapshot)?;

        self.set_phase(SyncPhase::Applying);
        let mut staged = self.catalog.stage(&snapshot).await?;
        let (diff, conn) = staged.diff_and_connection();
        let plan = self.engine.plan(diff, conn).await?;
        tracing::debug!(targeted = plan.targeted_count(), "targeted matches resolved");
        let diff = staged.commit().await?;

        self.set_phase(SyncPhase::Dispatching);
        let fan_out = self.engine.dispatch(&plan).await;

        Ok(CycleSummary {
            added: diff.added.len(),
            removed: diff.removed.len(),
            updated: diff.updated.len(),
            cold_start: diff.is_cold_start,
            catalog_size: diff.catalog_size(),
            general_alerts: fan_out.general_alerts,
            targeted_alerts: fan_out.targeted_alerts,
        })
    }

    /// Picks the sleep before the next cycle: the short retry interval
    /// after a transient failure, the normal interval otherwise.
    #[must_use]
    pub fn next_delay(&self, outcome: &Result<CycleSummary, SentinelError>) -> Duration {
        match outcome {
            Err(err) if err.is_transient() => self.schedule.retry_interval,
            _ => self.schedule.normal_interval,
        }
    }

    fn record(&self, outcome: &Result<CycleSummary, SentinelError>, delay: Duration) {
        let now = Utc::now();
        let next = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| now.checked_add_signed(d));

        self.status.send_modify(|s| {
            match outcome {
                Ok(summary) => {
                    s.cycles_completed += 1;
                    s.consecutive_failures = 0;
                    s.last_completed_at = Some(now);
                    s.last_cycle = Some(*summary);
                    s.last_error = None;
                }
                Err(err) => {
                    s.consecutive_failures = s.consecutive_failures.saturating_add(1);
                    s.last_error = Some(err.to_string());
                }
            }
            s.phase = SyncPhase::Sleeping;
            s.next_cycle_at = next;
        });
    }

    /// Runs cycles until `stop` flips to `true` or its sender is dropped.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        tracing::info!(
            normal_secs = self.schedule.normal_interval.as_secs(),
            retry_secs = self.schedule.retry_interval.as_secs(),
            tolerance = self.validator.tolerance(),
            "sync loop started"
        );

        loop {
            if *stop.borrow() {
                break;
            }

            let outcome = self.run_cycle().await;
            let delay = self.next_delay(&outcome);
            match &outcome {
                Ok(summary) => tracing::info!(
                    added = summary.added,
                    removed = summary.removed,
                    updated = summary.updated,
                    cold_start = summary.cold_start,
                    sleep_secs = delay.as_secs(),
                    "sync cycle completed"
                ),
                Err(err) => tracing::warn!(
                    error = %err,
                    sleep_secs = delay.as_secs(),
                    "sync cycle failed, retrying"
                ),
            }
            self.record(&outcome, delay);

            if !sleep_or_stop(delay, &mut stop).await {
                break;
            }
        }

        self.set_phase(SyncPhase::Stopped);
        tracing::info!("sync loop stopped");
    }
}

/// Sleeps for `delay`. Returns `false` if the stop signal fired first.
async fn sleep_or_stop(delay: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        tokio::select! {
            () = time::sleep_until(deadline) => return true,
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    return false;
                }
            }
        }
    }
}
