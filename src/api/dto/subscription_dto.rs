//! Subscription request and response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::RecipientId;
use crate::persistence::models::ItemSubscription;

/// Response body for `PUT /subscribers/{recipient_id}`.
#[derive(Debug, Serialize)]
pub struct GeneralSubscriptionResponse {
    /// Recipient that opted in.
    pub recipient_id: RecipientId,
    /// `false` if the recipient was already subscribed.
    pub created: bool,
}

/// Response body for `GET /subscribers/{recipient_id}`.
#[derive(Debug, Serialize)]
pub struct SubscriberResponse {
    /// Recipient queried.
    pub recipient_id: RecipientId,
    /// Receives general summaries.
    pub general: bool,
    /// Tracked titles.
    pub tracked: Vec<ItemSubscription>,
    /// Alerts waiting in the recipient's queue.
    pub pending_alerts: usize,
}

/// Request body for `POST /subscribers/{recipient_id}/tracked`.
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    /// Title to track, in any case.
    pub name: String,
}

/// Query for `DELETE /subscribers/{recipient_id}/tracked`.
#[derive(Debug, Deserialize)]
pub struct UntrackParams {
    /// Title to stop tracking, in any case.
    pub name: String,
}

/// Response body for `DELETE /subscribers/{recipient_id}/tracked`.
#[derive(Debug, Serialize)]
pub struct UntrackResponse {
    /// `false` if the title was not tracked.
    pub removed: bool,
}
