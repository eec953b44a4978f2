//! Service layer: subscription registry, diff fan-out, tracking requests,
//! and the synchronization loop that ties them to the catalog.

pub mod diff_engine;
pub mod subscription_registry;
pub mod sync_loop;
pub mod tracking;

pub use diff_engine::{DiffEngine, FanOutPlan, FanOutReport};
pub use subscription_registry::{ItemSubscriptionOutcome, RemovalReport, SubscriptionRegistry};
pub use sync_loop::{CycleSummary, SyncLoop, SyncPhase, SyncSchedule, SyncStatus};
pub use tracking::{TrackOutcome, TrackingService};
