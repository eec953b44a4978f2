//! Catalog and sync status DTOs.

use serde::Serialize;

use super::PaginationMeta;
use crate::domain::CatalogItem;
use crate::service::SyncStatus;

/// Response body for `GET /catalog`.
#[derive(Debug, Serialize)]
pub struct CatalogPageResponse {
    /// Items in source order.
    pub data: Vec<CatalogItem>,
    /// Paging metadata.
    pub pagination: PaginationMeta,
}

/// Response body for `GET /catalog/count`.
#[derive(Debug, Serialize)]
pub struct CatalogCountResponse {
    /// Number of catalog rows.
    pub total: u64,
}

/// Response body for `GET /sync/status`.
#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    /// Latest loop status.
    pub sync: SyncStatus,
    /// Alerts waiting across all recipients.
    pub pending_alerts: usize,
    /// Number of general subscribers.
    pub general_subscribers: usize,
}
