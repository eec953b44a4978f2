//! Engine error types with HTTP status code mapping.
//!
//! [`SentinelError`] is the central error type. The sync loop and the
//! dispatcher only log these; the REST surface maps each variant to a
//! status code and a structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::RecipientId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "recipient 42 already tracks \"doom eternal\""
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Engine-wide error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status               |
/// |-----------|---------------------|---------------------------|
/// | 1000–1999 | Validation          | 400 Bad Request           |
/// | 2000–2999 | Subscription state  | 409 Conflict              |
/// | 3000–3999 | Server / storage    | 500 Internal Server Error |
/// | 5000–5999 | Upstream collaborators | 502 Bad Gateway        |
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    /// The acquirer could not produce any snapshot.
    #[error("acquisition failed: {0}")]
    AcquisitionFailure(String),

    /// The snapshot was rejected by the completeness validator.
    #[error("incomplete scrape: observed {observed} of {expected} reported items")]
    IncompleteScrape {
        /// Number of items actually present in the snapshot.
        observed: usize,
        /// Item count the source claimed.
        expected: u64,
    },

    /// A storage transaction failed; prior state is intact.
    #[error("storage error: {0}")]
    Storage(String),

    /// The recipient already tracks this normalized name.
    #[error("recipient {recipient} already tracks {name:?}")]
    DuplicateSubscription {
        /// Recipient that issued the request.
        recipient: RecipientId,
        /// Normalized item name.
        name: String,
    },

    /// A single delivery through the notification transport failed.
    #[error("delivery to {recipient} failed: {reason}")]
    DeliveryFailure {
        /// Recipient the alert was addressed to.
        recipient: RecipientId,
        /// Transport-reported reason.
        reason: String,
    },

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration could not be loaded or is out of range.
    #[error("configuration error: {0}")]
    Config(String),

}

impl SentinelError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Config(_) => 1002,
            Self::DuplicateSubscription { .. } => 2001,
            Self::Storage(_) => 3001,
            Self::AcquisitionFailure(_) => 5001,
            Self::IncompleteScrape { .. } => 5002,
            Self::DeliveryFailure { .. } => 5003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateSubscription { .. } => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::AcquisitionFailure(_)
            | Self::IncompleteScrape { .. }
            | Self::DeliveryFailure { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Returns `true` for the failures the sync loop recovers from with
    /// its short retry interval.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::AcquisitionFailure(_) | Self::IncompleteScrape { .. } | Self::Storage(_)
        )
    }
}

impl From<sqlx::Error> for SentinelError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for SentinelError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl IntoResponse for SentinelError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_subscription_is_conflict() {
        let err = SentinelError::DuplicateSubscription {
            recipient: RecipientId::new(7),
            name: "doom eternal".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.error_code(), 2001);
        assert!(err.to_string().contains("doom eternal"));
    }

    #[test]
    fn transient_classification() {
        assert!(SentinelError::AcquisitionFailure("timeout".into()).is_transient());
        assert!(
            SentinelError::IncompleteScrape {
                observed: 10,
                expected: 100
            }
            .is_transient()
        );
        assert!(SentinelError::Storage("locked".into()).is_transient());
        assert!(!SentinelError::Config("bad".into()).is_transient());
        assert!(!SentinelError::InvalidRequest("empty".into()).is_transient());
    }

    #[test]
    fn incomplete_scrape_message_carries_counts() {
        let err = SentinelError::IncompleteScrape {
            observed: 12,
            expected: 40,
        };
        assert_eq!(
            err.to_string(),
            "incomplete scrape: observed 12 of 40 reported items"
        );
    }
}
