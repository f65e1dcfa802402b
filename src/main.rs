use crate::adapters::AdapterRegistry;
use crate::config::Config;
use crate::db::Database;
use crate::market::sources::{builtin_sources, market_client};
use crate::market::{FallbackTable, MarketAggregator, MarketCache};
use crate::orchestrator::Orchestrator;
use crate::refresh::{content_hash, CacheMetadata};
use crate::session::{BrowserLauncher, HttpLauncher, IdentityPool, SessionManager, WebDriverLauncher, ZenRowsProxy};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

mod adapters;
mod config;
mod consolidate;
mod db;
mod domain;
mod errors;
mod extract;
mod logging;
mod market;
mod normalize;
mod orchestrator;
mod pagination;
mod refresh;
mod session;

#[cfg(test)]
mod tests;

const FEED: &str = "auction_listings";

fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let launcher: Arc<dyn BrowserLauncher> = match &config.webdriver_url {
        Some(endpoint) => Arc::new(WebDriverLauncher::new(endpoint.clone())),
        None => {
            let mut http = HttpLauncher::new();
            if let Some(key) = &config.zenrows_api_key {
                http = http.with_proxy(ZenRowsProxy::new(key.clone()));
            }
            Arc::new(http)
        }
    };
    let sessions = SessionManager::new(launcher, config.rate_limiter());

    let mut registry = AdapterRegistry::builtin(&config.site_overrides()).context("built-in site selectors")?;
    registry.retain(&config.sources);

    let client = market_client(&IdentityPool::default().pick(), config.market_query_timeout)
        .context("market HTTP client")?;
    let aggregator = MarketAggregator::new(
        builtin_sources(client, &config.market_sources),
        Arc::new(MarketCache::new(config.market_cache_ttl)),
        FallbackTable::default(),
        config.market_query_timeout,
    );
    info!(adapters = ?registry.names(), market_sources = ?aggregator.source_names(), "pipeline configured");

    Ok(Orchestrator::new(
        registry,
        sessions,
        Arc::new(aggregator),
        config.pipeline_settings(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let config = Config::from_env().context("loading configuration")?;

    // 1️⃣ Create the database handle and apply the schema
    let db = Database::new(config.db_path.clone());
    db.init().context("database initialization")?;

    // 2️⃣ Skip the run unless the feed is due
    let previous = db.with_conn(|conn| db::load_feed_metadata(conn, FEED))?;
    let now = Utc::now();
    if !config.force_refresh && !config.refresh.is_due(previous.as_ref(), now) {
        info!(feed = FEED, last_update = ?previous.and_then(|m| m.last_update), "feed is fresh; nothing to do");
        return Ok(());
    }

    let orchestrator = build_orchestrator(&config)?;
    let run_id = db.with_conn(|conn| db::start_ingestion_run(conn, now.timestamp()))?;

    // 3️⃣ Collect, consolidate, price
    let report = orchestrator.run_ingestion(&config.filters).await;
    let finished = Utc::now();

    let json = serde_json::to_string_pretty(&report.listings).context("serializing listings")?;
    std::fs::write(&config.output_path, json).with_context(|| format!("writing {}", config.output_path))?;

    // 4️⃣ Record what we fetched
    let failure = report
        .stats
        .all_sources_failed
        .then(|| "all sources failed".to_string());
    if failure.is_none() {
        let meta = CacheMetadata::new(FEED, finished, report.listings.len(), content_hash(&report.listings));
        db.with_conn(|conn| db::save_feed_metadata(conn, &meta))?;
    } else {
        error!(feed = FEED, "no source produced data; feed metadata left unchanged");
    }
    db.with_conn(|conn| {
        db::end_ingestion_run(
            conn,
            run_id,
            finished.timestamp(),
            report.listings.len(),
            failure.is_none(),
            failure.clone(),
        )
    })?;

    info!(output = %config.output_path, listings = report.listings.len(), "listings written");
    println!("{}", serde_json::to_string_pretty(&report.stats)?);
    Ok(())
}
