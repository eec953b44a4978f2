//! Type-safe recipient identifier.
//!
//! [`RecipientId`] wraps the messaging channel's numeric chat identifier so
//! that recipients cannot be confused with other integers (positions,
//! counts, row ids).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a notification recipient.
///
/// Matches the transport's chat id space: signed 64-bit, where negative
/// values denote group chats. Used as the key of the general subscriber
/// set, of per-item subscriptions, and of the per-recipient alert queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(i64);

impl RecipientId {
    /// Wraps a raw chat identifier.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw chat identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecipientId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<i64> for RecipientId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<RecipientId> for i64 {
    fn from(id: RecipientId) -> Self {
        id.0
    }
}
