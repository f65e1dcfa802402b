// src/config.rs

use crate::adapters::SiteOverrides;
use crate::domain::AuctionRound;
use crate::normalize::NormalizeDefaults;
use crate::orchestrator::{IngestionFilters, PipelineSettings};
use crate::refresh::{parse_weekdays, RefreshPolicy};
use crate::session::RateLimiter;
use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: NormalizeDefaults,
    pub pipeline_deadline: Duration,
    pub navigation_timeout_secs: u64,
    pub headless: bool,
    pub webdriver_url: Option<String>,
    pub zenrows_api_key: Option<String>,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub max_pages: usize,
    pub detail_limit: usize,
    pub concurrent_adapters: bool,
    pub market_cache_ttl: Duration,
    pub market_query_timeout: Duration,
    pub market_sources: Vec<String>,
    /// Adapter allowlist; empty runs every built-in adapter.
    pub sources: Vec<String>,
    pub db_path: String,
    pub output_path: String,
    pub refresh: RefreshPolicy,
    pub force_refresh: bool,
    pub filters: IngestionFilters,
}

fn value<F>(get: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match value(get, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("{key} must be a valid value, got `{raw}`")),
        None => Ok(default),
    }
}

fn flag<F>(get: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match value(get, key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("{key} must be a boolean, got `{v}`")),
        },
    }
}

fn list<F>(get: &F, key: &str, default: &str) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    value(get, key)
        .unwrap_or_else(|| default.to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let weekdays = value(&get, "REFRESH_WEEKDAYS").unwrap_or_else(|| "mon,thu".to_string());
        let refresh = RefreshPolicy::new(
            parsed(&get, "REFRESH_INTERVAL_DAYS", 3)?,
            parse_weekdays(&weekdays).context("REFRESH_WEEKDAYS")?,
        );

        let auction_round = match value(&get, "AUCTION_ROUND") {
            Some(raw) => Some(
                raw.parse::<AuctionRound>()
                    .map_err(|e| anyhow!(e))
                    .context("AUCTION_ROUND must be first or second")?,
            ),
            None => None,
        };
        let max_price = match value(&get, "MAX_PRICE") {
            Some(_) => Some(parsed(&get, "MAX_PRICE", 0.0_f64)?),
            None => None,
        };

        let config = Self {
            defaults: NormalizeDefaults {
                default_city: value(&get, "DEFAULT_CITY").unwrap_or_else(|| "São Paulo".to_string()),
                default_state: value(&get, "DEFAULT_STATE").unwrap_or_else(|| "SP".to_string()),
            },
            pipeline_deadline: Duration::from_secs(parsed(&get, "PIPELINE_DEADLINE_SECS", 900)?),
            navigation_timeout_secs: parsed(&get, "NAV_TIMEOUT_SECS", 30)?,
            headless: flag(&get, "HEADLESS", true)?,
            webdriver_url: value(&get, "WEBDRIVER_URL"),
            zenrows_api_key: value(&get, "ZENROWS_API_KEY"),
            delay_min_ms: parsed(&get, "DELAY_MIN_MS", 800)?,
            delay_max_ms: parsed(&get, "DELAY_MAX_MS", 2500)?,
            max_pages: parsed(&get, "MAX_PAGES", 5)?,
            detail_limit: parsed(&get, "DETAIL_LIMIT", 40)?,
            concurrent_adapters: flag(&get, "CONCURRENT_ADAPTERS", true)?,
            market_cache_ttl: Duration::from_secs(parsed(&get, "MARKET_CACHE_TTL_SECS", 21_600)?),
            market_query_timeout: Duration::from_secs(parsed(&get, "MARKET_QUERY_TIMEOUT_SECS", 20)?),
            market_sources: list(&get, "MARKET_SOURCES", "zap,vivareal,quintoandar"),
            sources: list(&get, "SOURCES", ""),
            db_path: value(&get, "DB_PATH").unwrap_or_else(|| "leilao.sqlite3".to_string()),
            output_path: value(&get, "OUTPUT_PATH").unwrap_or_else(|| "listings.json".to_string()),
            refresh,
            force_refresh: flag(&get, "FORCE_REFRESH", false)?,
            filters: IngestionFilters {
                max_price,
                property_type: value(&get, "PROPERTY_TYPE"),
                city_allowlist: list(&get, "CITY_ALLOWLIST", ""),
                auction_round,
                state: value(&get, "SEARCH_STATE"),
            },
        };

        if config.max_pages == 0 {
            return Err(anyhow!("MAX_PAGES must be at least 1"));
        }
        Ok(config)
    }

    pub fn site_overrides(&self) -> SiteOverrides {
        SiteOverrides {
            headless: self.headless,
            navigation_timeout_secs: self.navigation_timeout_secs,
            max_pages: self.max_pages,
            detail_limit: self.detail_limit,
        }
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::from_millis(self.delay_min_ms, self.delay_max_ms)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            deadline: self.pipeline_deadline,
            concurrent_adapters: self.concurrent_adapters,
            defaults: self.defaults.clone(),
            market_sources: self.market_sources.clone(),
            ..PipelineSettings::default()
        }
    }
}
