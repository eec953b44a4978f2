//! sale-sentinel server entry point.
//!
//! Starts the sync loop, the alert dispatcher and the Axum HTTP server,
//! and stops all three on Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sale_sentinel::acquire::HttpFeedAcquirer;
use sale_sentinel::api;
use sale_sentinel::app_state::AppState;
use sale_sentinel::config::{LogFormat, SentinelConfig};
use sale_sentinel::dispatch::{AlertDispatcher, AlertQueues, AnyTransport, LogTransport, TelegramTransport};
use sale_sentinel::domain::CompletenessValidator;
use sale_sentinel::persistence::{self, CatalogStore, SubscriptionStore};
use sale_sentinel::service::{DiffEngine, SubscriptionRegistry, SyncLoop, TrackingService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::from_env());

    // Load configuration
    let config = SentinelConfig::from_env()
        .inspect_err(|e| tracing::error!(error = %e, "invalid configuration"))?;
    tracing::info!(addr = %config.listen_addr, "starting sale-sentinel");

    // Persistence
    let pool = persistence::connect(
        &config.database_url,
        config.database_max_connections,
        Duration::from_secs(config.database_connect_timeout_secs),
    )
    .await?;
    let catalog = CatalogStore::new(pool.clone());

    // Subscriptions and queues
    let queues = Arc::new(AlertQueues::new());
    let registry = Arc::new(
        SubscriptionRegistry::load(SubscriptionStore::new(pool), Arc::clone(&queues)).await?,
    );

    let (stop_tx, stop_rx) = watch::channel(false);

    // Dispatcher
    let transport = match &config.telegram_bot_token {
        Some(token) => AnyTransport::Telegram(TelegramTransport::new(
            config.telegram_api_base.clone(),
            token.clone(),
            config.delivery_timeout(),
        )?),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, alerts will only be logged");
            AnyTransport::Log(LogTransport)
        }
    };
    let dispatcher = AlertDispatcher::new(
        Arc::clone(&queues),
        Arc::new(transport),
        config.dispatch_tick(),
        config.delivery_timeout(),
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run(stop_rx.clone()));

    // Sync loop
    let acquirer = HttpFeedAcquirer::new(
        config.feed_url.clone(),
        Duration::from_secs(config.acquire_timeout_secs),
    )?;
    let engine = DiffEngine::new(
        Arc::clone(&registry),
        Arc::clone(&queues),
        config.remove_tracked_on_arrival,
    );
    let sync_loop = SyncLoop::new(
        acquirer,
        CompletenessValidator::new(config.completeness_tolerance)?,
        catalog.clone(),
        engine,
        config.sync_schedule(),
    );
    let sync_status = sync_loop.status();
    let sync_handle = tokio::spawn(sync_loop.run(stop_rx));

    // Build application state
    let app_state = AppState {
        tracking: TrackingService::new(catalog.clone(), Arc::clone(&registry)),
        catalog,
        registry,
        queues,
        sync_status,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    let _ = stop_tx.send(true);
    let (dispatcher_res, sync_res) = tokio::join!(dispatcher_handle, sync_handle);
    dispatcher_res?;
    sync_res?;
    tracing::info!("stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
