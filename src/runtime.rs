//! Process assembly: startup barrier, wiring, and the run loop.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapter::{MemoryStore, ProfitCacheUpdater, WebhookNotifier};
use crate::api::{self, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{CatalogClient, ChunkFetcher, HttpDispatcher, MarketApiClient};
use crate::governor::RateGovernor;
use crate::orchestrator::{UpdateContext, UpdateOrchestrator};
use crate::port::notifier::{Event, LogNotifier};
use crate::port::store::keys;
use crate::port::{NotifierRegistry, SnapshotStore};

/// Run the updater until the shutdown signal flips to `true`.
///
/// Startup is a hard barrier: the catalog, the server list, and the
/// marketable-item list must all load before any update work or the query
/// API starts. A failure here aborts the process instead of running with a
/// partial world view.
///
/// # Errors
///
/// Returns an error when a startup fetch fails or the query API listener
/// cannot bind.
pub async fn run(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    if config.webhook.enabled {
        match WebhookNotifier::new(config.webhook.clone()) {
            Ok(notifier) => registry.register(Box::new(notifier)),
            Err(err) => warn!(error = %err, "Webhook notifications disabled"),
        }
    }
    let notifiers = Arc::new(registry);
    notifiers.notify_all(Event::UpdaterStarted);

    let catalog_client = CatalogClient::new(http.clone(), config.upstream.clone());
    let market_client = Arc::new(MarketApiClient::new(http.clone(), config.upstream.clone()));

    info!("Loading catalog, server list, and marketable items");
    let (catalog, servers, items) = tokio::try_join!(
        catalog_client.load(),
        market_client.server_list(),
        market_client.marketable_items(),
    )?;
    info!(
        catalog_entries = catalog.len(),
        servers = servers.len(),
        items = items.len(),
        "Startup data loaded"
    );

    let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());
    store.set(keys::STATUS, "running".to_string()).await?;

    let governor = Arc::new(RateGovernor::new(
        config.governor.clone(),
        HttpDispatcher::new(http),
        Arc::clone(&notifiers),
    ));
    let fetcher = Arc::new(ChunkFetcher::new(
        Arc::clone(&governor),
        Arc::clone(&market_client),
        config.upstream.chunk_size,
    ));

    let orchestrator = Arc::new(UpdateOrchestrator::new(
        UpdateContext {
            fetcher,
            store: Arc::clone(&store),
            cache: Arc::new(ProfitCacheUpdater::new()),
            notifiers: Arc::clone(&notifiers),
            catalog: Arc::new(catalog),
        },
        servers,
        items,
        config.scheduler.clone(),
        config.upstream.chunk_size,
    ));

    let api_handle = if config.api.enabled {
        let api_config = config.api.clone();
        let state = ApiState {
            store: Arc::clone(&store),
            result_limit: config.api.result_limit,
        };
        let api_shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(err) = api::serve(&api_config, state, api_shutdown).await {
                warn!(error = %err, "Query API stopped unexpectedly");
            }
        }))
    } else {
        None
    };

    orchestrator.run(shutdown).await;

    governor.shutdown();
    if let Some(handle) = api_handle {
        let _ = handle.await;
    }
    store.set(keys::STATUS, "stopped".to_string()).await?;
    info!("Updater stopped");
    Ok(())
}
