// src/tests/utils.rs

use crate::adapters::challenge::ChallengeConfig;
use crate::adapters::{SiteSessionConfig, SourceUrl};
use crate::db::Database;
use crate::domain::{AuctionRound, Field, Listing, MarketSample};
use crate::errors::{BrowserError, MarketError};
use crate::extract::{compile_selector, StrategySpec as S};
use crate::market::{EstimateRequest, MarketSource};
use crate::pagination::PaginationPlan;
use crate::session::{document_title, find_href, Browser, BrowserLauncher, Identity, LaunchOptions, RateLimiter, SessionManager};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

const EMPTY_PAGE: &str = "<html><head><title></title></head><body></body></html>";

fn page_key(url: &str) -> String {
    Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

/// In-memory web: url → markup, with per-host latency and counters the
/// tests assert on.
#[derive(Default)]
pub struct FakeWeb {
    pages: HashMap<String, String>,
    fallback: Option<String>,
    latency: HashMap<String, Duration>,
    stealth_delay: Option<Duration>,
    fail_launch: bool,
    launched: AtomicUsize,
    closed: AtomicUsize,
    visits: Mutex<Vec<String>>,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(page_key(url), html.into());
        self
    }

    /// Served for every url without its own page.
    pub fn fallback(mut self, html: impl Into<String>) -> Self {
        self.fallback = Some(html.into());
        self
    }

    pub fn latency(mut self, host: &str, delay: Duration) -> Self {
        self.latency.insert(host.to_string(), delay);
        self
    }

    /// Every browser hangs this long while masking automation markers.
    pub fn slow_stealth(mut self, delay: Duration) -> Self {
        self.stealth_delay = Some(delay);
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

pub struct FakeLauncher {
    web: Arc<FakeWeb>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    fn name(&self) -> &str {
        "fake"
    }

    async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn Browser>, BrowserError> {
        if self.web.fail_launch {
            return Err(BrowserError::Launch("no browser engine".into()));
        }
        self.web.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowser {
            web: Arc::clone(&self.web),
            current: None,
            html: String::new(),
        }))
    }
}

pub struct FakeBrowser {
    web: Arc<FakeWeb>,
    current: Option<Url>,
    html: String,
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        let target = match &self.current {
            Some(base) => base.join(url),
            None => Url::parse(url),
        }
        .map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if let Some(delay) = target.host_str().and_then(|h| self.web.latency.get(h)) {
            tokio::time::sleep(*delay).await;
        }

        let key = target.to_string();
        if let Ok(mut visits) = self.web.visits.lock() {
            visits.push(key.clone());
        }
        self.html = self
            .web
            .pages
            .get(&key)
            .or(self.web.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| EMPTY_PAGE.to_string());
        self.current = Some(target);
        Ok(())
    }

    async fn html(&mut self) -> Result<String, BrowserError> {
        Ok(self.html.clone())
    }

    async fn title(&mut self) -> Result<String, BrowserError> {
        Ok(document_title(&self.html))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn click(&mut self, css: &str) -> Result<bool, BrowserError> {
        let href = {
            let selector = compile_selector(css).map_err(|e| BrowserError::Command(e.to_string()))?;
            find_href(&self.html, &selector)
        };
        match href {
            Some(href) => {
                self.goto(&href).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn apply_stealth(&mut self, _identity: &Identity) -> Result<(), BrowserError> {
        if let Some(delay) = self.web.stealth_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.web.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn sessions_for(web: &Arc<FakeWeb>) -> SessionManager {
    SessionManager::new(
        Arc::new(FakeLauncher { web: Arc::clone(web) }),
        RateLimiter::disabled(),
    )
}

pub fn card(href: &str, title: &str, price: &str, address: &str) -> String {
    format!(
        r#"<div class="card"><a href="{href}"><h2>{title}</h2></a><span class="price">{price}</span><p class="addr">{address}</p></div>"#
    )
}

pub fn listing_page(cards: &[String], next: Option<&str>) -> String {
    let next = next
        .map(|href| format!(r#"<a class="next" href="{href}">Próxima</a>"#))
        .unwrap_or_default();
    format!(
        "<html><head><title>Imóveis à venda</title></head><body>{}{next}</body></html>",
        cards.join("")
    )
}

pub const CHALLENGE_PAGE: &str =
    r#"<html><head><title>Just a moment...</title></head><body><div id="cf-chl-widget"></div></body></html>"#;

pub fn quick_challenge() -> ChallengeConfig {
    ChallengeConfig {
        max_wait_ms: 60,
        poll_interval_ms: 10,
        ..ChallengeConfig::default()
    }
}

/// Minimal card layout matching [`card`], paginated through `a.next`.
pub fn test_site_config(url: &str) -> SiteSessionConfig {
    let mut config = SiteSessionConfig::default()
        .with_source(SourceUrl::new(url))
        .with_cards(&["div.card"])
        .with_field(Field::Url, vec![S::attr("a", "href")])
        .with_field(Field::Title, vec![S::text("h2")])
        .with_field(Field::Price, vec![S::text(".price")])
        .with_field(Field::Address, vec![S::text(".addr")])
        .with_pagination(PaginationPlan::default().with_next("a.next"));
    config.navigation_timeout_secs = 1;
    config.challenge = quick_challenge();
    config
}

pub fn listing(source: &str, id: &str, neighborhood: &str, price: f64) -> Listing {
    Listing {
        source_id: format!("{source}:{id}"),
        source: source.to_string(),
        partner: None,
        address: String::new(),
        neighborhood: neighborhood.to_string(),
        city: "São Paulo".to_string(),
        state: "SP".to_string(),
        property_type: String::new(),
        private_area_m2: 0.0,
        total_area_m2: 0.0,
        bedrooms: 0,
        parking_spots: 0,
        asking_price: price,
        appraised_value: 0.0,
        discount_percent: 0.0,
        auction_round: AuctionRound::First,
        sale_modality: String::new(),
        auction_date: String::new(),
        description: String::new(),
        images: Vec::new(),
        source_url: format!("https://{source}.test/imovel/{id}"),
        extraction_timestamp: Utc::now(),
        incomplete: price <= 0.0,
        market: None,
    }
}

pub fn request(neighborhood: &str, city: &str, property_type: &str, bedrooms: u32, area: f64) -> EstimateRequest {
    EstimateRequest {
        neighborhood: neighborhood.to_string(),
        city: city.to_string(),
        state: "SP".to_string(),
        property_type: property_type.to_string(),
        bedrooms,
        reference_area_m2: area,
    }
}

pub struct FakeMarketSource {
    name: String,
    samples: Vec<MarketSample>,
    fail: bool,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl FakeMarketSource {
    pub fn new(name: &str, samples: Vec<MarketSample>) -> Self {
        Self {
            name: name.to_string(),
            samples,
            fail: false,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, Vec::new())
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl MarketSource for FakeMarketSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, _request: &EstimateRequest) -> Result<Vec<MarketSample>, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(MarketError::QueryFailed {
                site: self.name.clone(),
                reason: "HTTP 503".into(),
            });
        }
        Ok(self.samples.clone())
    }
}

/// Fresh database in its own temp directory, schema applied.
pub fn init_test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir failed: {e}"));
    let path = dir.path().join("test.sqlite3");
    let db = Database::new(path.to_string_lossy().to_string());
    db.init()
        .unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    (dir, db)
}
