//! Domain layer: catalog model, snapshots, diffs, alerts, and the
//! completeness gate.
//!
//! Everything here is storage- and transport-agnostic. The persistence
//! layer turns snapshots into [`DiffResult`]s and the service layer turns
//! diffs into [`PendingAlert`]s.

pub mod alert;
pub mod catalog_item;
pub mod diff;
pub mod recipient_id;
pub mod snapshot;
pub mod validator;

pub use alert::{AlertPayload, PendingAlert};
pub use catalog_item::{CatalogItem, UNKNOWN_PRICE, normalize_name};
pub use diff::DiffResult;
pub use recipient_id::RecipientId;
pub use snapshot::{RawItem, RawSnapshot};
pub use validator::CompletenessValidator;
