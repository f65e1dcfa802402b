// src/pagination.rs

//! Drives incremental loading of listing pages.
//!
//! Two behaviors: lazy scrolling within one page, and discrete pagination
//! ("next" control or a synthesized page-number URL). The page cap is a hard
//! bound on pages visited, and a navigation timeout ends pagination quietly.

use crate::adapters::challenge::{self, ChallengeConfig};
use crate::errors::ScrapeError;
use crate::session::{RateLimiter, Session};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// How to synthesize the URL of page N from the first page URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageUrlStyle {
    /// `?pagina=N`
    QueryParam { name: String },
    /// `/pg-N`; `{page}` is replaced by the number.
    PathSuffix { pattern: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationPlan {
    pub max_pages: usize,
    /// Clicked first when present on the page.
    pub next_selector: Option<String>,
    /// Fallback when no next control matches.
    pub page_url: Option<PageUrlStyle>,
    /// Scroll-to-bottom passes before each page is read.
    pub scrolls_per_page: usize,
}

impl Default for PaginationPlan {
    fn default() -> Self {
        Self {
            max_pages: 5,
            next_selector: None,
            page_url: None,
            scrolls_per_page: 0,
        }
    }
}

impl PaginationPlan {
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_next(mut self, css: &str) -> Self {
        self.next_selector = Some(css.to_string());
        self
    }

    pub fn with_page_param(mut self, name: &str) -> Self {
        self.page_url = Some(PageUrlStyle::QueryParam {
            name: name.to_string(),
        });
        self
    }

    pub fn with_scrolls(mut self, scrolls: usize) -> Self {
        self.scrolls_per_page = scrolls;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    PageCap,
    NoNewItems,
    NoNextPage,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOutcome {
    pub pages_visited: usize,
    pub stop: StopReason,
}

fn outcome(pages_visited: usize, stop: StopReason) -> PaginationOutcome {
    PaginationOutcome { pages_visited, stop }
}

/// URL of `page` derived from the first page's URL.
pub fn page_url(first_url: &str, style: &PageUrlStyle, page: usize) -> Option<String> {
    match style {
        PageUrlStyle::QueryParam { name } => {
            let mut url = Url::parse(first_url).ok()?;
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(k, _)| k != name.as_str())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair(name, &page.to_string());
            Some(url.to_string())
        }
        PageUrlStyle::PathSuffix { pattern } => {
            let suffix = pattern.replace("{page}", &page.to_string());
            let (path, query) = match first_url.split_once('?') {
                Some((p, q)) => (p, Some(q)),
                None => (first_url, None),
            };
            let base = path.trim_end_matches('/');
            Some(match query {
                Some(q) => format!("{base}{suffix}?{q}"),
                None => format!("{base}{suffix}"),
            })
        }
    }
}

/// Scrolls to the bottom `times` times with a jittered pause after each.
/// Stops early on timeout or error. Returns the completed passes.
pub async fn lazy_scroll(session: &mut Session, times: usize, limiter: &RateLimiter) -> usize {
    for done in 0..times {
        match session.scroll_to_bottom().await {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                debug!(site = session.site(), pass = done + 1, "scroll timed out; treating as loaded");
                return done;
            }
            Err(e) => {
                warn!(site = session.site(), error = %e, "scroll failed");
                return done;
            }
        }
        limiter.pause().await;
    }
    times
}

async fn advance(
    session: &mut Session,
    first_url: &str,
    plan: &PaginationPlan,
    next_page: usize,
) -> Result<bool, ScrapeError> {
    if let Some(css) = &plan.next_selector {
        if session.click(css).await? {
            return Ok(true);
        }
    }
    if let Some(style) = &plan.page_url {
        if let Some(url) = page_url(first_url, style, next_page) {
            session.goto(&url).await?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Loads `first_url`, then keeps advancing until a page contributes no new
/// items, there is no way forward, the cap is hit, or a wait times out.
///
/// `on_page(page_number, html)` parses one page and returns how many items it
/// had not seen before. A persistent bot challenge is the only error that
/// escapes besides browser failures; items parsed before it stay with the caller.
pub async fn paginate<F>(
    session: &mut Session,
    first_url: &str,
    plan: &PaginationPlan,
    challenge: Option<&ChallengeConfig>,
    mut on_page: F,
) -> Result<PaginationOutcome, ScrapeError>
where
    F: FnMut(usize, &str) -> usize + Send,
{
    let limiter = session.limiter();
    let cap = plan.max_pages.max(1);

    match session.goto(first_url).await {
        Ok(()) => {}
        Err(e) if e.is_timeout() => {
            warn!(site = session.site(), url = first_url, "first page timed out");
            return Ok(outcome(0, StopReason::Timeout));
        }
        Err(e) => return Err(e),
    }

    let mut page = 1;
    loop {
        if let Some(cfg) = challenge {
            challenge::wait_until_clear(session, cfg).await?;
        }

        if plan.scrolls_per_page > 0 {
            lazy_scroll(session, plan.scrolls_per_page, &limiter).await;
        }

        let html = match session.html().await {
            Ok(html) => html,
            Err(e) if e.is_timeout() => return Ok(outcome(page, StopReason::Timeout)),
            Err(e) => return Err(e),
        };

        let fresh = on_page(page, &html);
        debug!(site = session.site(), page, fresh, "page parsed");

        if fresh == 0 {
            return Ok(outcome(page, StopReason::NoNewItems));
        }
        if page >= cap {
            return Ok(outcome(page, StopReason::PageCap));
        }

        limiter.pause().await;

        match advance(session, first_url, plan, page + 1).await {
            Ok(true) => page += 1,
            Ok(false) => return Ok(outcome(page, StopReason::NoNextPage)),
            Err(e) if e.is_timeout() => {
                debug!(site = session.site(), page = page + 1, "next page timed out; no more content");
                return Ok(outcome(page, StopReason::Timeout));
            }
            Err(e) => return Err(e),
        }
    }
}
