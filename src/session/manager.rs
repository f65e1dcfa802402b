// src/session/manager.rs

use crate::errors::{BrowserError, ScrapeError};
use crate::adapters::SiteSessionConfig;
use crate::session::browser::{Browser, BrowserLauncher, LaunchOptions};
use crate::session::identity::Identity;
use crate::session::rate_limiter::RateLimiter;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const RELEASE_TIMEOUT: Duration = Duration::from_secs(10);

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A launched browser bound to one adapter run.
///
/// Not `Clone`; adapters only ever see `&mut Session`. Every page operation
/// is bounded by the configured navigation timeout and a timeout surfaces as
/// [`ScrapeError::NavigationTimeout`].
pub struct Session {
    id: u64,
    site: String,
    identity: Identity,
    navigation_timeout: Duration,
    limiter: RateLimiter,
    browser: Option<Box<dyn Browser>>,
}

async fn within<T, F>(limit: Duration, what: &str, fut: F) -> Result<T, ScrapeError>
where
    F: Future<Output = Result<T, BrowserError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(ScrapeError::from),
        Err(_) => Err(ScrapeError::NavigationTimeout {
            url: what.to_string(),
        }),
    }
}

impl Session {
    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn limiter(&self) -> RateLimiter {
        self.limiter
    }

    pub fn is_released(&self) -> bool {
        self.browser.is_none()
    }

    fn browser(&mut self) -> Result<&mut Box<dyn Browser>, ScrapeError> {
        self.browser
            .as_mut()
            .ok_or(ScrapeError::Browser(BrowserError::Released))
    }

    pub async fn goto(&mut self, url: &str) -> Result<(), ScrapeError> {
        let limit = self.navigation_timeout;
        let browser = self.browser()?;
        within(limit, url, browser.goto(url)).await
    }

    pub async fn html(&mut self) -> Result<String, ScrapeError> {
        let limit = self.navigation_timeout;
        let browser = self.browser()?;
        within(limit, "<page source>", browser.html()).await
    }

    pub async fn title(&mut self) -> Result<String, ScrapeError> {
        let limit = self.navigation_timeout;
        let browser = self.browser()?;
        within(limit, "<page title>", browser.title()).await
    }

    pub async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
        let limit = self.navigation_timeout;
        let browser = self.browser()?;
        within(limit, "<scroll>", browser.scroll_to_bottom()).await
    }

    pub async fn click(&mut self, css: &str) -> Result<bool, ScrapeError> {
        let limit = self.navigation_timeout;
        let browser = self.browser()?;
        within(limit, css, browser.click(css)).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Reached only when a run was abandoned without `release`, e.g. the
        // task was aborted at the pipeline deadline.
        if let Some(mut browser) = self.browser.take() {
            warn!(session = self.id, site = %self.site, "session dropped unreleased; closing in background");
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = tokio::time::timeout(RELEASE_TIMEOUT, browser.close()).await;
                });
            }
        }
    }
}

/// Hands out and takes back browser sessions. Its whole contract is
/// [`acquire`](Self::acquire) / [`release`](Self::release).
#[derive(Clone)]
pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    limiter: RateLimiter,
    next_id: Arc<AtomicU64>,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, limiter: RateLimiter) -> Self {
        Self {
            launcher,
            limiter,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Launches a browser with a fresh identity from the site's pool, masks
    /// automation markers, then waits a randomized settle delay.
    pub async fn acquire(&self, site: &str, config: &SiteSessionConfig) -> Result<Session, ScrapeError> {
        let identity = config.identities.pick();
        let navigation_timeout = config.navigation_timeout();
        let options = LaunchOptions {
            headless: config.headless,
            navigation_timeout,
            identity: identity.clone(),
        };

        let mut browser = within(navigation_timeout, "<launch>", self.launcher.launch(&options)).await?;

        if let Err(e) = within(navigation_timeout, "<stealth>", browser.apply_stealth(&identity)).await {
            let _ = tokio::time::timeout(RELEASE_TIMEOUT, browser.close()).await;
            return Err(e);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(
            session = id,
            site,
            backend = self.launcher.name(),
            user_agent = %identity.user_agent,
            timezone = %identity.timezone,
            "session acquired"
        );

        self.limiter.pause_scaled(2).await;

        Ok(Session {
            id,
            site: site.to_string(),
            identity,
            navigation_timeout,
            limiter: self.limiter,
            browser: Some(browser),
        })
    }

    /// Closes the browser. Never fails; close errors are only logged.
    pub async fn release(&self, mut session: Session) {
        let Some(mut browser) = session.browser.take() else {
            return;
        };
        match tokio::time::timeout(RELEASE_TIMEOUT, browser.close()).await {
            Ok(Ok(())) => debug!(session = session.id, site = %session.site, "session released"),
            Ok(Err(e)) => warn!(session = session.id, site = %session.site, error = %e, "browser close failed"),
            Err(_) => warn!(session = session.id, site = %session.site, "browser close timed out"),
        }
    }

    /// Scoped session: acquire, run `body`, release.
    ///
    /// Release happens when the body returns, fails or panics. Acquisition is
    /// abandoned if `cancel` fires first; once the body runs it observes the
    /// token itself so it can return partial results. A task aborted mid-body
    /// still closes its browser through `Session`'s drop.
    pub async fn with_session<T, F>(
        &self,
        site: &str,
        config: &SiteSessionConfig,
        cancel: &CancellationToken,
        body: F,
    ) -> Result<T, ScrapeError>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, ScrapeError>>,
    {
        let mut session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            acquired = self.acquire(site, config) => acquired?,
        };

        let outcome = AssertUnwindSafe(body(&mut session)).catch_unwind().await;
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(session = session.id, site, panic = %message, "adapter panicked; releasing session");
                Err(ScrapeError::Panicked(message))
            }
        };

        self.release(session).await;
        result
    }
}
