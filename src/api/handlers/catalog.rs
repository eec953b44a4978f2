//! Read-only catalog endpoints and sync status.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    CatalogCountResponse, CatalogPageResponse, PaginationMeta, PaginationParams,
    SyncStatusResponse,
};
use crate::app_state::AppState;
use crate::error::SentinelError;

/// `GET /catalog` — One page of the catalog in source order.
///
/// # Errors
///
/// Returns [`SentinelError::Storage`] on database failure.
pub async fn list_catalog(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, SentinelError> {
    let params = params.clamped();
    let total = state.catalog.count().await?;
    let data = state.catalog.page(params.offset, params.limit).await?;
    let returned = u32::try_from(data.len()).unwrap_or(u32::MAX);

    Ok(Json(CatalogPageResponse {
        pagination: PaginationMeta::new(&params, returned, total),
        data,
    }))
}

/// `GET /catalog/count` — Number of items currently on sale.
///
/// # Errors
///
/// Returns [`SentinelError::Storage`] on database failure.
pub async fn count_catalog(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, SentinelError> {
    let total = state.catalog.count().await?;
    Ok(Json(CatalogCountResponse { total }))
}

/// `GET /sync/status` — Latest sync loop status and queue depth.
pub async fn sync_status(State(state): State<AppState>) -> impl IntoResponse {
    let sync = state.sync_status.borrow().clone();
    Json(SyncStatusResponse {
        sync,
        pending_alerts: state.queues.pending_total().await,
        general_subscribers: state.registry.general_count().await,
    })
}

/// Catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(list_catalog))
        .route("/catalog/count", get(count_catalog))
        .route("/sync/status", get(sync_status))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::test_support::{json, request, send, state};
    use crate::domain::{RawItem, RawSnapshot};

    #[tokio::test]
    async fn pages_through_catalog() {
        let state = state().await;
        let items = (0..5)
            .map(|i| RawItem::new(format!("Game {i}"), format!("k{i}")))
            .collect();
        let _ = state
            .catalog
            .replace_and_diff(&RawSnapshot::new(items, 5))
            .await;

        let response = send(&state, request("GET", "/api/v1/catalog?offset=0&limit=2", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["data"][0]["key"], "k0");
        assert_eq!(body["pagination"]["total"], 5);
        assert_eq!(body["pagination"]["next_offset"], 2);

        let last = json(send(&state, request("GET", "/api/v1/catalog?offset=4", None)).await).await;
        assert_eq!(last["data"].as_array().map(Vec::len), Some(1));
        assert!(last["pagination"].get("next_offset").is_none());
    }

    #[tokio::test]
    async fn count_on_empty_catalog_is_zero() {
        let state = state().await;
        let body = json(send(&state, request("GET", "/api/v1/catalog/count", None)).await).await;
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn sync_status_starts_idle() {
        let state = state().await;
        let body = json(send(&state, request("GET", "/api/v1/sync/status", None)).await).await;
        assert_eq!(body["sync"]["phase"], "idle");
        assert_eq!(body["pending_alerts"], 0);
    }
}
