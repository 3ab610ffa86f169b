//! Feed Harvester — Binary Entrypoint
//! Wires the backend client, scraper, and scheduler together and boots the
//! Axum control API the dashboard talks to.
//!
//! The scheduler is constructed here and handed down by reference; nothing in
//! the crate relies on a module-level singleton.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_harvester::api::{create_router, AppState};
use news_harvester::backend::{BackendApi, HttpBackend};
use news_harvester::metrics::Metrics;
use news_harvester::scrape::feed::{FeedTransport, HttpTransport};
use news_harvester::scrape::scheduler::ScraperScheduler;
use news_harvester::scrape::{config, sources, Scraper};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_harvester=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default().context("loading scraper config")?;
    let metrics = Metrics::init(cfg.interval().as_secs());

    let sources = sources::load_sources_default().context("loading source registry")?;
    tracing::info!(sources = sources.len(), backend = %cfg.backend_url, "registry loaded");

    let backend: Arc<dyn BackendApi> =
        Arc::new(HttpBackend::new(&cfg.backend_url, cfg.request_timeout()));
    let transport: Arc<dyn FeedTransport> = Arc::new(HttpTransport::new(cfg.request_timeout()));
    let scraper = Arc::new(Scraper::new(
        sources,
        transport,
        backend.clone(),
        cfg.fail_open_duplicate_check,
    ));
    let scheduler = Arc::new(ScraperScheduler::new(
        scraper.clone(),
        backend,
        cfg.scheduler_cfg(),
    ));

    if cfg.start_on_init {
        scheduler.clone().start().await;
    }

    let state = AppState {
        scheduler: scheduler.clone(),
        scraper,
    };
    let router = create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    tracing::info!(addr = %cfg.listen_addr, "harvester control api listening");
    axum::serve(listener, router).await.context("serving api")?;
    Ok(())
}
