//! Snapshot acquisition seam.
//!
//! How the source page is rendered, scrolled, or parsed is the acquirer's
//! business. The sync loop only needs an ordered list of records plus the
//! source's own item count.

pub mod feed;

use std::future::Future;

pub use feed::HttpFeedAcquirer;

use crate::domain::RawSnapshot;
use crate::error::SentinelError;

/// Produces snapshots of the external catalog.
///
/// Implementations must bound their own running time and report
/// `reported_total = 0` when the source does not expose a count.
pub trait Acquirer: Send + Sync + 'static {
    /// Reads the full catalog once.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::AcquisitionFailure`] when no snapshot could
    /// be produced (timeout, unreachable source, unparseable payload).
    fn acquire(&self) -> impl Future<Output = Result<RawSnapshot, SentinelError>> + Send;
}
