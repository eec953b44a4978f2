//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::dispatch::AlertQueues;
use crate::persistence::CatalogStore;
use crate::service::{SubscriptionRegistry, SyncStatus, TrackingService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read access to the catalog.
    pub catalog: CatalogStore,
    /// Subscription registry (write-through).
    pub registry: Arc<SubscriptionRegistry>,
    /// Subscribe-time tracking logic.
    pub tracking: TrackingService,
    /// Pending alert queues, for status reporting.
    pub queues: Arc<AlertQueues>,
    /// Latest sync loop status.
    pub sync_status: watch::Receiver<SyncStatus>,
}
