//! Engine configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Optional tuning knobs fall back to
//! defaults on missing or unparseable values; the feed URL and the
//! completeness tolerance are validated and fail startup when wrong.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::CompletenessValidator;
use crate::error::SentinelError;
use crate::service::SyncSchedule;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT` (and `.env`) on its own, so logging can be set up
    /// before the rest of the configuration is validated.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    /// `json` (any case) selects [`LogFormat::Json`]; anything else is text.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Top-level configuration.
///
/// Loaded once at startup via [`SentinelConfig::from_env`].
#[derive(Debug, Clone)]
pub struct SentinelConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// SQLite connection string.
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Seconds to sleep after a completed sync cycle.
    pub sync_interval_secs: u64,

    /// Seconds to sleep after a failed or rejected sync cycle.
    pub sync_retry_interval_secs: u64,

    /// Minimum observed/reported ratio for a snapshot to be applied.
    pub completeness_tolerance: f64,

    /// Seconds between dispatcher ticks.
    pub dispatch_tick_secs: u64,

    /// Per-delivery timeout in seconds.
    pub delivery_timeout_secs: u64,

    /// Delete per-item subscriptions once they have fired.
    pub remove_tracked_on_arrival: bool,

    /// URL of the JSON snapshot feed.
    pub feed_url: String,

    /// Timeout in seconds for one feed acquisition.
    pub acquire_timeout_secs: u64,

    /// Telegram bot token; `None` selects the log-only transport.
    pub telegram_bot_token: Option<String>,

    /// Telegram Bot API base URL.
    pub telegram_api_base: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl SentinelConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Config`] if `LISTEN_ADDR` cannot be parsed,
    /// `FEED_URL` is missing, or `COMPLETENESS_TOLERANCE` is not a number
    /// in `(0, 1]`.
    pub fn from_env() -> Result<Self, SentinelError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| SentinelError::Config(format!("LISTEN_ADDR: {e}")))?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://sale_sentinel.db".to_string());
        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 5);
        let database_connect_timeout_secs = parse_env("DATABASE_CONNECT_TIMEOUT_SECS", 5);

        let sync_interval_secs = parse_env("SYNC_INTERVAL_SECS", 1800);
        let sync_retry_interval_secs = parse_env("SYNC_RETRY_INTERVAL_SECS", 60);

        let completeness_tolerance = match std::env::var("COMPLETENESS_TOLERANCE") {
            Ok(raw) => raw.trim().parse::<f64>().map_err(|e| {
                SentinelError::Config(format!("COMPLETENESS_TOLERANCE {raw:?}: {e}"))
            })?,
            Err(_) => CompletenessValidator::DEFAULT_TOLERANCE,
        };
        CompletenessValidator::new(completeness_tolerance)?;

        let dispatch_tick_secs = parse_env("DISPATCH_TICK_SECS", 10);
        let delivery_timeout_secs = parse_env("DELIVERY_TIMEOUT_SECS", 5);
        let remove_tracked_on_arrival = parse_env_bool("REMOVE_TRACKED_ON_ARRIVAL", true);

        let feed_url = std::env::var("FEED_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| SentinelError::Config("FEED_URL must be set".to_string()))?;
        let acquire_timeout_secs = parse_env("ACQUIRE_TIMEOUT_SECS", 120);

        let telegram_bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let telegram_api_base = std::env::var("TELEGRAM_API_BASE")
            .unwrap_or_else(|_| "https://api.telegram.org".to_string());

        let log_format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());

        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections,
            database_connect_timeout_secs,
            sync_interval_secs,
            sync_retry_interval_secs,
            completeness_tolerance,
            dispatch_tick_secs,
            delivery_timeout_secs,
            remove_tracked_on_arrival,
            feed_url,
            acquire_timeout_secs,
            telegram_bot_token,
            telegram_api_base,
            log_format,
        })
    }

    /// Sync loop intervals.
    #[must_use]
    pub fn sync_schedule(&self) -> SyncSchedule {
        SyncSchedule {
            normal_interval: Duration::from_secs(self.sync_interval_secs),
            retry_interval: Duration::from_secs(self.sync_retry_interval_secs),
        }
    }

    /// Dispatcher tick interval (at least one second).
    #[must_use]
    pub fn dispatch_tick(&self) -> Duration {
        Duration::from_secs(self.dispatch_tick_secs.max(1))
    }

    /// Per-delivery timeout.
    #[must_use]
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs.max(1))
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
