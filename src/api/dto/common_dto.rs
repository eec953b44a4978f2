//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};

/// Offset pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    /// Number of rows to skip. Defaults to 0.
    #[serde(default)]
    pub offset: u32,
    /// Rows per page (max 100). Defaults to 50.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    /// Rows skipped.
    pub offset: u32,
    /// Requested page size.
    pub limit: u32,
    /// Rows in this page.
    pub returned: u32,
    /// Total number of rows.
    pub total: u64,
    /// Offset of the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u32>,
}

fn default_limit() -> u32 {
    50
}

impl PaginationParams {
    /// Clamps `limit` to the allowed range `1..=100`.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            offset: self.offset,
            limit: self.limit.clamp(1, 100),
        }
    }
}

impl PaginationMeta {
    /// Builds metadata for a page of `returned` rows out of `total`.
    #[must_use]
    pub fn new(params: &PaginationParams, returned: u32, total: u64) -> Self {
        let end = u64::from(params.offset) + u64::from(returned);
        let next_offset = if returned > 0 && end < total {
            u32::try_from(end).ok()
        } else {
            None
        };
        Self {
            offset: params.offset,
            limit: params.limit,
            returned,
            total,
            next_offset,
        }
    }
}
