// errors.rs
use thiserror::Error;

/// A single field, card or record could not be turned into usable data.
/// Always recovered locally and counted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("malformed card #{index}: {reason}")]
    MalformedCard { index: usize, reason: String },

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Errors raised by a browser backend (HTTP or WebDriver).
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser command failed: {0}")]
    Command(String),

    #[error("session already released")]
    Released,
}

/// Errors surfaced by a site adapter run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{site} blocked by bot challenge: {reason}")]
    SourceBlocked { site: String, reason: String },

    #[error("navigation timed out: {url}")]
    NavigationTimeout { url: String },

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("site misconfigured: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("adapter panicked: {0}")]
    Panicked(String),
}

impl ScrapeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScrapeError::NavigationTimeout { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, ScrapeError::SourceBlocked { .. })
    }
}

/// Per-source market query failures. Swallowed by the aggregator.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("{site} query failed: {reason}")]
    QueryFailed { site: String, reason: String },

    #[error("{site} query timed out")]
    Timeout { site: String },

    #[error("{site} returned an unexpected payload: {reason}")]
    Decode { site: String, reason: String },
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("open DB failed: {0}")]
    Open(String),

    #[error("database error: {0}")]
    Query(String),

    #[error("connection slot unavailable")]
    Unavailable,
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::Query(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}
