// src/market/sources/mod.rs

pub mod glue;
pub mod quintoandar;

pub use glue::{GlueSource, Portal};
pub use quintoandar::QuintoAndarSource;

use crate::errors::MarketError;
use crate::market::MarketSource;
use crate::session::Identity;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Shared HTTP client for every live market source.
pub fn market_client(identity: &Identity, timeout: Duration) -> Result<Client, MarketError> {
    let mut headers = HeaderMap::new();
    if let Ok(lang) = HeaderValue::from_str(&identity.accept_language()) {
        headers.insert(ACCEPT_LANGUAGE, lang);
    }
    Client::builder()
        .user_agent(identity.user_agent.clone())
        .default_headers(headers)
        .gzip(true)
        .timeout(timeout)
        .build()
        .map_err(|e| MarketError::QueryFailed {
            site: "client".to_string(),
            reason: e.to_string(),
        })
}

/// Live sources by name. Unknown names are logged and skipped.
pub fn builtin_sources(client: Client, names: &[String]) -> Vec<Arc<dyn MarketSource>> {
    names
        .iter()
        .filter_map(|name| -> Option<Arc<dyn MarketSource>> {
            match name.trim().to_ascii_lowercase().as_str() {
                "zap" => Some(Arc::new(GlueSource::new(client.clone(), Portal::Zap))),
                "vivareal" => Some(Arc::new(GlueSource::new(client.clone(), Portal::VivaReal))),
                quintoandar::NAME => Some(Arc::new(QuintoAndarSource::new(client.clone()))),
                other => {
                    warn!(source = other, "unknown market source ignored");
                    None
                }
            }
        })
        .collect()
}
