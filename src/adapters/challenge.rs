// src/adapters/challenge.rs

//! Bot-challenge detection. A page whose title or markup carries a known
//! interstitial marker is re-polled for a bounded time; if it never clears
//! the source is reported as blocked.

use crate::errors::ScrapeError;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Lowercase substrings of the document title.
    pub title_markers: Vec<String>,
    /// Lowercase substrings of the raw markup.
    pub body_markers: Vec<String>,
    pub max_wait_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        Self {
            title_markers: owned(&[
                "just a moment",
                "attention required",
                "access denied",
                "um momento",
                "acesso negado",
                "are you a robot",
            ]),
            // Interstitial-only markers. Cloudflare also injects
            // /cdn-cgi/challenge-platform/scripts/jsd into ordinary pages.
            body_markers: owned(&[
                "cf-chl-",
                "cf_chl_opt",
                "challenge-form",
                "px-captcha",
                "captcha-delivery",
            ]),
            max_wait_ms: 15_000,
            poll_interval_ms: 1_000,
        }
    }
}

/// The marker found, if the page is a challenge interstitial.
pub fn detect<'a>(config: &'a ChallengeConfig, title: &str, html: &str) -> Option<&'a str> {
    let title = title.to_lowercase();
    if let Some(marker) = config.title_markers.iter().find(|m| title.contains(m.as_str())) {
        return Some(marker);
    }
    let html = html.to_lowercase();
    config
        .body_markers
        .iter()
        .find(|m| html.contains(m.as_str()))
        .map(String::as_str)
}

pub async fn wait_until_clear(session: &mut Session, config: &ChallengeConfig) -> Result<(), ScrapeError> {
    let started = Instant::now();
    let deadline = started + Duration::from_millis(config.max_wait_ms);
    let poll = Duration::from_millis(config.poll_interval_ms.max(1));

    loop {
        // A page that cannot even report its title is not a challenge we can see.
        let title = session.title().await.unwrap_or_default();
        let html = session.html().await.unwrap_or_default();

        let Some(marker) = detect(config, &title, &html) else {
            if started.elapsed() > poll {
                debug!(site = session.site(), waited = ?started.elapsed(), "challenge cleared");
            }
            return Ok(());
        };

        let now = Instant::now();
        if now >= deadline {
            warn!(site = session.site(), marker, waited = ?started.elapsed(), "challenge persisted; giving up on source");
            return Err(ScrapeError::SourceBlocked {
                site: session.site().to_string(),
                reason: format!("challenge marker `{marker}` persisted for {}ms", config.max_wait_ms),
            });
        }

        debug!(site = session.site(), marker, "bot challenge detected; waiting");
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}
