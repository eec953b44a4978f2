//! REST API layer: route handlers, DTOs, and router composition.
//!
//! The thin command surface in front of the engine. Resource endpoints are
//! mounted under `/api/v1`; the health check lives at the root.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, Response};
    use tokio::sync::watch;
    use tower::ServiceExt;

    use crate::app_state::AppState;
    use crate::dispatch::AlertQueues;
    use crate::persistence::{CatalogStore, SubscriptionStore, open_in_memory};
    use crate::service::{SubscriptionRegistry, SyncStatus, TrackingService};

    /// Fresh state over a private in-memory database.
    pub(crate) async fn state() -> AppState {
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
        let catalog = CatalogStore::new(pool);
        let (_tx, sync_status) = watch::channel(SyncStatus::default());
        AppState {
            tracking: TrackingService::new(catalog.clone(), Arc::clone(&registry)),
            catalog,
            registry,
            queues,
            sync_status,
        }
    }

    /// Sends one request through the full router.
    pub(crate) async fn send(state: &AppState, request: Request<Body>) -> Response<Body> {
        let app: Router = super::build_router().with_state(state.clone());
        let Ok(response) = app.oneshot(request).await else {
            panic!("router failed");
        };
        response
    }

    /// Reads a response body as JSON.
    pub(crate) async fn json(response: Response<Body>) -> serde_json::Value {
        let Ok(bytes) = to_bytes(response.into_body(), 1 << 20).await else {
            panic!("body read failed");
        };
        serde_json::from_slice(&bytes).unwrap_or_default()
    }

    /// Builds a request with an optional JSON body.
    pub(crate) fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        let built = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string())),
            None => builder.body(Body::empty()),
        };
        let Ok(request) = built else {
            panic!("bad request");
        };
        request
    }
}
