//! # sale-sentinel
//!
//! Catalog synchronization and alert dispatch engine.
//!
//! The engine periodically acquires a snapshot of a discounted-item
//! catalog, rejects snapshots that are visibly incomplete, atomically
//! replaces the stored catalog while computing what was added, and fans
//! the additions out to subscribers through rate-limited per-recipient
//! queues.
//!
//! ## Architecture
//!
//! ```text
//! Feed (HTTP JSON)                  Clients (HTTP)
//!     │                                 │
//!     ├── Acquirer (acquire/)           ├── REST Handlers (api/)
//!     │                                 │
//!     ├── SyncLoop (service/) ──────────┤
//!     │     ├── CompletenessValidator   │
//!     │     ├── CatalogStore ───────────┤  (persistence/, SQLite)
//!     │     └── DiffEngine              │
//!     │           └── SubscriptionRegistry
//!     │
//!     ├── AlertQueues (dispatch/)
//!     │
//!     └── AlertDispatcher ── NotificationTransport (Telegram | log)
//! ```

pub mod acquire;
pub mod api;
pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
