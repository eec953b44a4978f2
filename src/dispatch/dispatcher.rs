//! Tick-driven alert dispatcher.
//!
//! On every tick each non-empty recipient queue gives up exactly one alert,
//! so a queue of `N` alerts drains in `N` ticks regardless of how many
//! recipients are waiting. Deliveries within a tick run concurrently and
//! each is bounded by a timeout; failed or timed-out alerts are dropped.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use super::queue::AlertQueues;
use super::transport::NotificationTransport;
use crate::domain::{PendingAlert, RecipientId};

/// Outcome counts for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Alerts the transport accepted.
    pub delivered: usize,
    /// Alerts dropped after a transport error or timeout.
    pub failed: usize,
}

impl TickReport {
    /// Number of delivery attempts made during the tick.
    #[must_use]
    pub const fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Drains [`AlertQueues`] through a [`NotificationTransport`] at a fixed
/// cadence.
#[derive(Debug)]
pub struct AlertDispatcher<T> {
    queues: Arc<AlertQueues>,
    transport: Arc<T>,
    tick_interval: Duration,
    delivery_timeout: Duration,
}

impl<T: NotificationTransport> AlertDispatcher<T> {
    /// Creates a dispatcher over shared queues.
    #[must_use]
    pub fn new(
        queues: Arc<AlertQueues>,
        transport: Arc<T>,
        tick_interval: Duration,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            queues,
            transport,
            tick_interval,
            delivery_timeout,
        }
    }

    /// Performs one tick: pops one alert per non-empty queue and attempts
    /// every delivery concurrently.
    pub async fn tick(&self) -> TickReport {
        let batch = self.queues.pop_front_each().await;
        let mut report = TickReport::default();

        if !batch.is_empty() {
            let outcomes = join_all(
                batch
                    .into_iter()
                    .map(|(recipient, alert)| self.deliver(recipient, alert)),
            )
            .await;

            for delivered in outcomes {
                if delivered {
                    report.delivered += 1;
                } else {
                    report.failed += 1;
                }
            }
        }

        self.queues.reclaim_empty().await;
        report
    }

    async fn deliver(&self, recipient: RecipientId, alert: PendingAlert) -> bool {
        let text = alert.render();
        let waited_ms = (chrono::Utc::now() - alert.enqueued_at).num_milliseconds();

        match time::timeout(self.delivery_timeout, self.transport.send(recipient, &text)).await {
            Ok(Ok(())) => {
                tracing::debug!(%recipient, alert_id = %alert.id, kind = alert.kind(), waited_ms, "alert delivered");
                true
            }
            Ok(Err(err)) => {
                tracing::warn!(%recipient, alert_id = %alert.id, kind = alert.kind(), error = %err, "delivery failed, alert dropped");
                false
            }
            Err(_) => {
                tracing::warn!(
                    %recipient,
                    alert_id = %alert.id,
                    kind = alert.kind(),
                    timeout_ms = u64::try_from(self.delivery_timeout.as_millis()).unwrap_or(u64::MAX),
                    "delivery timed out, alert dropped"
                );
                false
            }
        }
    }

    /// Runs the ticker until `stop` flips to `true` or its sender is dropped.
    ///
    /// The first delivery happens one full interval after start.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        tracing::info!(
            tick_ms = u64::try_from(self.tick_interval.as_millis()).unwrap_or(u64::MAX),
            "alert dispatcher started"
        );

        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    if report.attempted() > 0 {
                        tracing::info!(delivered = report.delivered, failed = report.failed, "dispatch tick");
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        let pending = self.queues.pending_total().await;
        tracing::info!(pending, "alert dispatcher stopped");
    }
}
