//! Per-recipient FIFO alert queues with per-queue locking.
//!
//! [`AlertQueues`] keeps one `VecDeque` per recipient behind its own
//! [`tokio::sync::Mutex`], inside an outer `RwLock<HashMap<...>>`. Appends
//! and pops on the same recipient are serialized; different recipients
//! never contend beyond the shared read lock.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::domain::{PendingAlert, RecipientId};

type Queue = Arc<Mutex<VecDeque<PendingAlert>>>;

/// Pending alerts for every recipient.
///
/// # Concurrency
///
/// - Appends and pops take the outer read lock plus the recipient's mutex.
/// - Purging and reclaiming drained queues take the outer write lock, so
///   they never race with an in-progress append.
#[derive(Debug, Default)]
pub struct AlertQueues {
    queues: RwLock<HashMap<RecipientId, Queue>>,
}

impl AlertQueues {
    /// Creates an empty set of queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an alert to the back of a recipient's queue.
    pub async fn enqueue(&self, recipient: RecipientId, alert: PendingAlert) {
        {
            let map = self.queues.read().await;
            if let Some(queue) = map.get(&recipient) {
                queue.lock().await.push_back(alert);
                return;
            }
        }

        let mut map = self.queues.write().await;
        map.entry(recipient)
            .or_default()
            .lock()
            .await
            .push_back(alert);
    }

    /// Pops the oldest alert of every non-empty queue, ordered by recipient.
    pub async fn pop_front_each(&self) -> Vec<(RecipientId, PendingAlert)> {
        let map = self.queues.read().await;
        let mut batch = Vec::with_capacity(map.len());
        for (recipient, queue) in map.iter() {
            if let Some(alert) = queue.lock().await.pop_front() {
                batch.push((*recipient, alert));
            }
        }
        batch.sort_by_key(|(recipient, _)| *recipient);
        batch
    }

    /// Drops a recipient's queue, returning how many alerts it held.
    pub async fn purge(&self, recipient: RecipientId) -> usize {
        let mut map = self.queues.write().await;
        let Some(queue) = map.remove(&recipient) else {
            return 0;
        };
        let dropped = queue.lock().await.len();
        drop(map);

        if dropped > 0 {
            tracing::info!(%recipient, dropped, "pending alerts purged");
        }
        dropped
    }

    /// Removes queues that have been fully drained.
    pub async fn reclaim_empty(&self) {
        let mut map = self.queues.write().await;
        // Holding the write lock means no append or pop owns a queue mutex.
        map.retain(|_, queue| queue.try_lock().map_or(true, |q| !q.is_empty()));
    }

    /// Number of alerts waiting for one recipient.
    pub async fn len(&self, recipient: RecipientId) -> usize {
        let map = self.queues.read().await;
        match map.get(&recipient) {
            Some(queue) => queue.lock().await.len(),
            None => 0,
        }
    }

    /// Total number of alerts waiting across all recipients.
    pub async fn pending_total(&self) -> usize {
        let map = self.queues.read().await;
        let mut total = 0;
        for queue in map.values() {
            total += queue.lock().await.len();
        }
        total
    }

    /// Returns `true` if no alert is waiting anywhere.
    pub async fn is_empty(&self) -> bool {
        self.pending_total().await == 0
    }
}
