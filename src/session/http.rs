// src/session/http.rs

//! Plain HTTP backend. Good enough for server-rendered listing pages: the
//! identity goes into request headers, a cookie jar persists for the session,
//! "clicks" follow the matched element's `href` and scrolling is a no-op.
//! Optionally routes every request through the ZenRows proxy API.

use crate::errors::BrowserError;
use crate::extract::{clean_text, compile_selector};
use crate::session::browser::{Browser, BrowserLauncher, LaunchOptions};
use crate::session::identity::Identity;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const ZENROWS_ENDPOINT: &str = "https://api.zenrows.com/v1/";

#[derive(Debug, Clone)]
pub struct ZenRowsProxy {
    api_key: String,
    endpoint: String,
}

impl ZenRowsProxy {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: ZENROWS_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HttpLauncher {
    proxy: Option<ZenRowsProxy>,
}

impl HttpLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proxy(mut self, proxy: ZenRowsProxy) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

fn build_headers(identity: &Identity) -> Result<HeaderMap, BrowserError> {
    let mut headers = HeaderMap::new();
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    let lang = HeaderValue::from_str(&identity.accept_language())
        .map_err(|e| BrowserError::Launch(format!("bad accept-language: {e}")))?;
    headers.insert(ACCEPT_LANGUAGE, lang);
    Ok(headers)
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    fn name(&self) -> &str {
        "http"
    }

    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Browser>, BrowserError> {
        let client = Client::builder()
            .user_agent(options.identity.user_agent.as_str())
            .default_headers(build_headers(&options.identity)?)
            .cookie_store(true)
            .gzip(true)
            .timeout(options.navigation_timeout)
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        Ok(Box::new(HttpBrowser {
            client,
            proxy: self.proxy.clone(),
            current_url: None,
            current_html: String::new(),
        }))
    }
}

pub struct HttpBrowser {
    client: Client,
    proxy: Option<ZenRowsProxy>,
    current_url: Option<Url>,
    current_html: String,
}

/// Statuses whose body is kept instead of failing the navigation: anti-bot
/// layers answer with these, and challenge detection needs to see the page.
fn is_challenge_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    )
}

impl HttpBrowser {
    fn resolve(&self, url: &str) -> Result<Url, BrowserError> {
        let parsed = match &self.current_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        parsed.map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn fetch_direct(&self, url: &Url) -> Result<String, BrowserError> {
        let nav_err = |reason: String| BrowserError::Navigation {
            url: url.to_string(),
            reason,
        };

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| nav_err(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| nav_err(e.to_string()))?;

        if status.is_success() || is_challenge_status(status) {
            if !status.is_success() {
                debug!(url = %url, %status, "keeping non-success body for challenge detection");
            }
            Ok(text)
        } else {
            Err(nav_err(format!("HTTP {status}")))
        }
    }

    async fn fetch_via_zenrows(&self, proxy: &ZenRowsProxy, url: &Url) -> Result<String, BrowserError> {
        const MAX_ATTEMPTS: u64 = 3;
        const MAX_BACKOFF_SECS: u64 = 10;
        const JITTER_MAX_MS: u64 = 2000;

        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let start = std::time::Instant::now();

            match self.try_fetch_via_zenrows(proxy, url).await {
                Ok(html) => {
                    debug!(url = %url, attempt, elapsed = ?start.elapsed(), "ZenRows success");
                    return Ok(html);
                }
                Err(e) => {
                    warn!(url = %url, attempt, elapsed = ?start.elapsed(), error = %e, "ZenRows attempt failed");
                    last_err = Some(e);

                    if attempt < MAX_ATTEMPTS {
                        let base = std::cmp::min(2 * attempt, MAX_BACKOFF_SECS);
                        let jitter = rand::thread_rng().gen_range(0..=JITTER_MAX_MS);
                        tokio::time::sleep(Duration::from_secs(base) + Duration::from_millis(jitter)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| BrowserError::Navigation {
            url: url.to_string(),
            reason: "ZenRows retry loop failed".into(),
        }))
    }

    async fn try_fetch_via_zenrows(&self, proxy: &ZenRowsProxy, url: &Url) -> Result<String, BrowserError> {
        let nav_err = |reason: String| BrowserError::Navigation {
            url: url.to_string(),
            reason,
        };

        let mut params = HashMap::new();
        params.insert("url", url.to_string());
        params.insert("apikey", proxy.api_key.clone());
        params.insert("original_status", "true".to_string());
        params.insert("mode", "auto".to_string());

        let resp = self
            .client
            .get(&proxy.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| nav_err(e.to_string()))?;

        let status = resp.status();
        let original_status = resp
            .headers()
            .iter()
            .find(|(k, _)| k.as_str().to_ascii_lowercase().contains("original"))
            .and_then(|(_, v)| v.to_str().ok())
            .unwrap_or("<none>")
            .to_string();

        let text = resp.text().await.map_err(|e| nav_err(e.to_string()))?;

        if !status.is_success() {
            return Err(nav_err(format!("ZenRows HTTP {status} ({original_status})")));
        }

        if text.starts_with('{') {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) {
                if json.get("code").is_some() {
                    return Err(nav_err(format!("ZenRows API error ({original_status}): {text}")));
                }
            }
        }

        Ok(text)
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        let target = self.resolve(url)?;
        let html = match &self.proxy {
            Some(proxy) => self.fetch_via_zenrows(proxy, &target).await?,
            None => self.fetch_direct(&target).await?,
        };
        self.current_url = Some(target);
        self.current_html = html;
        Ok(())
    }

    async fn html(&mut self) -> Result<String, BrowserError> {
        Ok(self.current_html.clone())
    }

    async fn title(&mut self) -> Result<String, BrowserError> {
        Ok(document_title(&self.current_html))
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn click(&mut self, css: &str) -> Result<bool, BrowserError> {
        let href = {
            let selector = compile_selector(css).map_err(|e| BrowserError::Command(e.to_string()))?;
            find_href(&self.current_html, &selector)
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
        // Headers already carry the identity; there is no JS surface to mask.
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.current_url = None;
        self.current_html.clear();
        Ok(())
    }
}

pub(crate) fn document_title(html: &str) -> String {
    let document = Html::parse_document(html);
    match Selector::parse("title") {
        Ok(sel) => document
            .select(&sel)
            .next()
            .map(|el| clean_text(&el.text().collect::<String>()))
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// `href` of the first element matching `selector`, skipping `#` and
/// `javascript:` placeholders.
pub(crate) fn find_href(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let href = document
        .select(selector)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty() && *href != "#" && !href.starts_with("javascript:"))
        .map(str::to_string);
    href
}
