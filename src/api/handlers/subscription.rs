//! Subscription endpoints: general opt-in/opt-out and per-item tracking.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Json, Router};

use crate::api::dto::{
    GeneralSubscriptionResponse, SubscriberResponse, TrackRequest, UntrackParams, UntrackResponse,
};
use crate::app_state::AppState;
use crate::domain::RecipientId;
use crate::error::SentinelError;
use crate::service::TrackOutcome;

/// `PUT /subscribers/{recipient_id}` — Opt into general alerts.
///
/// # Errors
///
/// Returns [`SentinelError::Storage`] on database failure.
pub async fn subscribe_general(
    State(state): State<AppState>,
    Path(recipient_id): Path<RecipientId>,
) -> Result<impl IntoResponse, SentinelError> {
    let created = state.registry.add_general(recipient_id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(GeneralSubscriptionResponse {
            recipient_id,
            created,
        }),
    ))
}

/// `DELETE /subscribers/{recipient_id}` — Opt out of everything.
///
/// # Errors
///
/// Returns [`SentinelError::Storage`] on database failure.
pub async fn unsubscribe_all(
    State(state): State<AppState>,
    Path(recipient_id): Path<RecipientId>,
) -> Result<impl IntoResponse, SentinelError> {
    let report = state.registry.remove_general(recipient_id).await?;
    Ok(Json(report))
}

/// `GET /subscribers/{recipient_id}` — Subscription overview.
///
/// # Errors
///
/// Returns [`SentinelError::Storage`] on database failure.
pub async fn get_subscriber(
    State(state): State<AppState>,
    Path(recipient_id): Path<RecipientId>,
) -> Result<impl IntoResponse, SentinelError> {
    let tracked = state.registry.item_subscriptions(recipient_id).await?;
    Ok(Json(SubscriberResponse {
        recipient_id,
        general: state.registry.is_general(recipient_id).await,
        tracked,
        pending_alerts: state.queues.len(recipient_id).await,
    }))
}

/// `POST /subscribers/{recipient_id}/tracked` — Track a title.
///
/// Answers `201` when a subscription was created and `200` with the
/// matching items when the title is already on sale.
///
/// # Errors
///
/// Returns [`SentinelError::DuplicateSubscription`] (409) if the title is
/// already tracked, [`SentinelError::InvalidRequest`] for a blank name.
pub async fn track_item(
    State(state): State<AppState>,
    Path(recipient_id): Path<RecipientId>,
    Json(req): Json<TrackRequest>,
) -> Result<impl IntoResponse, SentinelError> {
    let outcome = state.tracking.track(recipient_id, &req.name).await?;
    let status = match outcome {
        TrackOutcome::Created { .. } => StatusCode::CREATED,
        TrackOutcome::AlreadyOnSale { .. } => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

/// `GET /subscribers/{recipient_id}/tracked` — List tracked titles.
///
/// # Errors
///
/// Returns [`SentinelError::Storage`] on database failure.
pub async fn list_tracked(
    State(state): State<AppState>,
    Path(recipient_id): Path<RecipientId>,
) -> Result<impl IntoResponse, SentinelError> {
    let tracked = state.registry.item_subscriptions(recipient_id).await?;
    Ok(Json(tracked))
}

/// `DELETE /subscribers/{recipient_id}/tracked?name=...` — Stop tracking.
///
/// # Errors
///
/// Returns [`SentinelError::InvalidRequest`] for a blank name.
pub async fn untrack_item(
    State(state): State<AppState>,
    Path(recipient_id): Path<RecipientId>,
    Query(params): Query<UntrackParams>,
) -> Result<impl IntoResponse, SentinelError> {
    let removed = state
        .registry
        .remove_item_subscription(recipient_id, &params.name)
        .await?;
    Ok(Json(UntrackResponse { removed }))
}

/// Subscription routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/subscribers/{recipient_id}",
            put(subscribe_general)
                .delete(unsubscribe_all)
                .get(get_subscriber),
        )
        .route(
            "/subscribers/{recipient_id}/tracked",
            post(track_item)
                .get(list_tracked)
                .delete(untrack_item),
        )
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json as body;

    use crate::api::test_support::{json, request, send, state};
    use crate::domain::{RawItem, RawSnapshot};

    #[tokio::test]
    async fn general_opt_in_is_idempotent() {
        let state = state().await;
        let first = send(&state, request("PUT", "/api/v1/subscribers/42", None)).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = send(&state, request("PUT", "/api/v1/subscribers/42", None)).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(json(second).await["created"], false);
    }

    #[tokio::test]
    async fn track_then_duplicate_conflicts() {
        let state = state().await;
        let created = send(
            &state,
            request("POST", "/api/v1/subscribers/7/tracked", Some(body!({"name": "Hades"}))),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(json(created).await["normalized_name"], "hades");

        let dup = send(
            &state,
            request("POST", "/api/v1/subscribers/7/tracked", Some(body!({"name": " HADES "}))),
        )
        .await;
        assert_eq!(dup.status(), StatusCode::CONFLICT);
        assert_eq!(json(dup).await["error"]["code"], 2001);
    }

    #[tokio::test]
    async fn tracking_item_on_sale_answers_immediately() {
        let state = state().await;
        let _ = state
            .catalog
            .replace_and_diff(&RawSnapshot::new(vec![RawItem::new("Hades", "k1")], 0))
            .await;

        let response = send(
            &state,
            request("POST", "/api/v1/subscribers/7/tracked", Some(body!({"name": "hades"}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload = json(response).await;
        assert_eq!(payload["status"], "already_on_sale");
        assert_eq!(payload["items"][0]["key"], "k1");
    }

    #[tokio::test]
    async fn blank_name_is_bad_request() {
        let state = state().await;
        let response = send(
            &state,
            request("POST", "/api/v1/subscribers/7/tracked", Some(body!({"name": "  "}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unsubscribe_all_cascades() {
        let state = state().await;
        let _ = send(&state, request("PUT", "/api/v1/subscribers/9", None)).await;
        let _ = send(
            &state,
            request("POST", "/api/v1/subscribers/9/tracked", Some(body!({"name": "Celeste"}))),
        )
        .await;

        let response = send(&state, request("DELETE", "/api/v1/subscribers/9", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let report = json(response).await;
        assert_eq!(report["was_general"], true);
        assert_eq!(report["item_subscriptions"], 1);

        let overview = json(send(&state, request("GET", "/api/v1/subscribers/9", None)).await).await;
        assert_eq!(overview["general"], false);
        assert_eq!(overview["tracked"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn untrack_by_query() {
        let state = state().await;
        let _ = send(
            &state,
            request("POST", "/api/v1/subscribers/3/tracked", Some(body!({"name": "Doom Eternal"}))),
        )
        .await;
        let response = send(
            &state,
            request("DELETE", "/api/v1/subscribers/3/tracked?name=doom%20eternal", None),
        )
        .await;
        assert_eq!(json(response).await["removed"], true);
    }

    #[tokio::test]
    async fn non_numeric_recipient_is_rejected() {
        let state = state().await;
        let response = send(&state, request("PUT", "/api/v1/subscribers/abc", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
