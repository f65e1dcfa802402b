// src/adapters/mod.rs

pub mod caixa;
pub mod challenge;
mod config;
pub mod engine;
pub mod mega_leiloes;
mod registry;
pub mod resale;
mod runner;
pub mod sold_leiloes;
pub mod zuk;

pub use config::{SearchQuery, SiteOverrides, SiteSessionConfig, SourceUrl};
pub use engine::{CompiledSite, ListingPage};
pub use registry::AdapterRegistry;
pub use runner::{run_adapter, AdapterReport, RunOutcome, SourceStats};

use crate::domain::RawExtraction;
use crate::errors::ScrapeError;
use crate::session::Session;
use async_trait::async_trait;

/// One auction website. Implementations own their selector configuration and
/// never share a session with another adapter.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn config(&self) -> &SiteSessionConfig;

    /// Navigates the (pre-filtered) search pages and returns every card found.
    async fn collect_listing_page(
        &self,
        session: &mut Session,
        query: &SearchQuery,
    ) -> Result<ListingPage, ScrapeError>;

    /// Detail-page superset of a listing card's fields.
    async fn collect_detail(&self, session: &mut Session, url: &str) -> Result<RawExtraction, ScrapeError>;

    fn wants_details(&self) -> bool {
        !self.config().detail_fields.is_empty() && self.config().detail_limit > 0
    }
}
