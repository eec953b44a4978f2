//! Persistence layer: SQLite catalog and subscription tables.
//!
//! [`CatalogStore`] owns the catalog rows and applies snapshots inside a
//! single transaction. [`SubscriptionStore`] holds the raw subscription
//! tables; in-memory caching on top of it lives in the service layer.

pub mod catalog_store;
pub mod models;
pub mod subscription_store;

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub use catalog_store::{CatalogStore, StagedReplace};
pub use subscription_store::SubscriptionStore;

use crate::error::SentinelError;

/// Embedded schema migrations from `./migrations`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Opens (creating if missing) the SQLite database at `url` in WAL mode and
/// applies pending migrations.
///
/// # Errors
///
/// Returns [`SentinelError::Storage`] if the URL is malformed, the database
/// cannot be opened, or a migration fails.
pub async fn connect(
    url: &str,
    max_connections: u32,
    connect_timeout: Duration,
) -> Result<SqlitePool, SentinelError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(connect_timeout)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    tracing::info!(url, max_connections, "database ready");
    Ok(pool)
}

/// Opens a private in-memory database with the schema applied.
///
/// The pool is pinned to one connection that never expires, since every
/// SQLite in-memory connection is a separate database.
///
/// # Errors
///
/// Returns [`SentinelError::Storage`] if SQLite cannot be initialized.
pub async fn open_in_memory() -> Result<SqlitePool, SentinelError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
