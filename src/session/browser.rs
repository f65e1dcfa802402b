// src/session/browser.rs

use crate::errors::BrowserError;
use crate::session::identity::Identity;
use async_trait::async_trait;
use std::time::Duration;

/// The page-level operations adapters need from an automation backend.
///
/// Implementations are driven through `&mut self` only; one browser belongs
/// to exactly one session.
#[async_trait]
pub trait Browser: Send {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Markup of the current document.
    async fn html(&mut self) -> Result<String, BrowserError>;

    async fn title(&mut self) -> Result<String, BrowserError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError>;

    /// Clicks the first element matching `css`. `Ok(false)` when nothing matches.
    async fn click(&mut self, css: &str) -> Result<bool, BrowserError>;

    /// Hides automation markers and applies the identity's locale/timezone.
    async fn apply_stealth(&mut self, identity: &Identity) -> Result<(), BrowserError>;

    async fn close(&mut self) -> Result<(), BrowserError>;
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub navigation_timeout: Duration,
    pub identity: Identity,
}

/// Starts browsers. Injected into the session manager so the backend can be
/// swapped (HTTP, WebDriver, in-memory for tests).
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    fn name(&self) -> &str;

    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Browser>, BrowserError>;
}
