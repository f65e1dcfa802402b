// src/session/webdriver.rs

//! WebDriver backend (chromedriver/geckodriver) for script-rendered sites.

use crate::errors::BrowserError;
use crate::session::browser::{Browser, BrowserLauncher, LaunchOptions};
use crate::session::identity::Identity;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    endpoint: String,
}

impl WebDriverLauncher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

fn capabilities(options: &LaunchOptions) -> Map<String, Value> {
    let identity = &options.identity;
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        format!("--user-agent={}", identity.user_agent),
        format!("--lang={}", identity.locale),
        format!("--window-size={},{}", identity.viewport_width, identity.viewport_height),
    ];
    if options.headless {
        args.push("--headless=new".to_string());
    }

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({
            "args": args,
            "excludeSwitches": ["enable-automation"],
            "useAutomationExtension": false,
            "prefs": { "intl.accept_languages": identity.accept_language() },
        }),
    );
    caps.insert(
        "timeouts".to_string(),
        json!({ "pageLoad": options.navigation_timeout.as_millis() as u64 }),
    );
    caps
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    fn name(&self) -> &str {
        "webdriver"
    }

    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn Browser>, BrowserError> {
        info!(endpoint = %self.endpoint, headless = options.headless, "connecting to webdriver");
        let client = ClientBuilder::native()
            .capabilities(capabilities(options))
            .connect(&self.endpoint)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let identity = &options.identity;
        if let Err(e) = client
            .set_window_size(identity.viewport_width, identity.viewport_height)
            .await
        {
            debug!(error = %e, "could not resize window");
        }

        Ok(Box::new(WebDriverBrowser {
            client: Some(client),
            stealth: None,
        }))
    }
}

pub struct WebDriverBrowser {
    client: Option<Client>,
    stealth: Option<String>,
}

fn cmd_err(e: fantoccini::error::CmdError) -> BrowserError {
    BrowserError::Command(e.to_string())
}

impl WebDriverBrowser {
    fn client(&self) -> Result<&Client, BrowserError> {
        self.client.as_ref().ok_or(BrowserError::Released)
    }

    async fn run_stealth(&self) -> Result<(), BrowserError> {
        if let Some(script) = &self.stealth {
            self.client()?
                .execute(script, vec![])
                .await
                .map_err(cmd_err)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.client()?
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        // Overrides do not survive navigation.
        self.run_stealth().await
    }

    async fn html(&mut self) -> Result<String, BrowserError> {
        self.client()?.source().await.map_err(cmd_err)
    }

    async fn title(&mut self) -> Result<String, BrowserError> {
        self.client()?.title().await.map_err(cmd_err)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError> {
        self.client()?
            .execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
            .await
            .map(|_| ())
            .map_err(cmd_err)
    }

    async fn click(&mut self, css: &str) -> Result<bool, BrowserError> {
        match self.client()?.find(Locator::Css(css)).await {
            Ok(element) => {
                element.click().await.map_err(cmd_err)?;
                Ok(true)
            }
            Err(e) if e.is_no_such_element() => Ok(false),
            Err(e) => Err(cmd_err(e)),
        }
    }

    async fn apply_stealth(&mut self, identity: &Identity) -> Result<(), BrowserError> {
        self.stealth = Some(identity.stealth_script());
        self.run_stealth().await
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        match self.client.take() {
            Some(client) => client.close().await.map_err(cmd_err),
            None => Ok(()),
        }
    }
}
