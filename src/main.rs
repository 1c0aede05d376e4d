//! Sui Event Indexer binary.
//!
//! Reads configuration from the environment (and `.env`), then runs the
//! events and transactions loops until Ctrl+C.

use std::sync::Arc;
use sui_event_indexer::utils::logging;
use sui_event_indexer::{
    ChainIndexer, EventStore, EventsIndexer, JsonRpcProvider, PgEventStore, Result,
    RetryingRpcProvider, SuiIndexerConfig, TransactionsIndexer,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    #[cfg(feature = "telemetry")]
    let _telemetry = sui_event_indexer::telemetry::init_telemetry(
        sui_event_indexer::telemetry::TelemetryConfig::default(),
    );

    let config = SuiIndexerConfig::from_env()?;
    logging::log_startup(
        &config.rpc_url,
        &config.database_url,
        config.event_selectors.len(),
        u64::try_from(config.events_indexer.polling_interval.as_millis()).unwrap_or(u64::MAX),
    );

    let store = Arc::new(PgEventStore::new(&config.database_url).await?);
    store.ensure_schema().await?;
    logging::log(logging::LogLevel::Success, "Database schema initialized");

    let rpc = RetryingRpcProvider::new(
        JsonRpcProvider::new(&config.rpc_url, config.rpc_timeout)?,
        config.retry.clone(),
    );
    let events = EventsIndexer::new(
        Arc::new(rpc),
        store.clone(),
        config.event_selectors.clone(),
        config.events_indexer,
    );
    let transactions = TransactionsIndexer::new(config.transactions_indexer);

    let indexer = ChainIndexer::new(Arc::new(events), Arc::new(transactions));
    let root = CancellationToken::new();
    indexer.start(&root)?;

    if let Err(err) = tokio::signal::ctrl_c().await {
        logging::log_error("Signal handler", &err.to_string());
    }
    logging::log(logging::LogLevel::Info, "Received Ctrl+C, shutting down...");

    root.cancel();
    indexer.close()?;
    indexer.wait().await;
    store.close().await;

    logging::log(logging::LogLevel::Success, "Shutdown complete");
    Ok(())
}
