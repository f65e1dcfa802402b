// src/adapters/config.rs

use crate::adapters::challenge::ChallengeConfig;
use crate::domain::Field;
use crate::extract::StrategySpec;
use crate::pagination::PaginationPlan;
use crate::session::IdentityPool;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A listing entry point; `partner` names the bank a sub-listing belongs to
/// on multi-partner portals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUrl {
    pub url: String,
    #[serde(default)]
    pub partner: Option<String>,
}

impl SourceUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            partner: None,
        }
    }

    pub fn partner(url: impl Into<String>, partner: &str) -> Self {
        Self {
            url: url.into(),
            partner: Some(partner.to_string()),
        }
    }
}

/// Search filters an adapter may push into its listing URLs. Sites that
/// cannot filter server-side ignore them; the orchestrator filters again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub state: Option<String>,
    pub property_type: Option<String>,
    pub max_price: Option<f64>,
}

/// Everything one site needs to be scraped: browser settings, entry points,
/// selector chains, pagination style, challenge handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSessionConfig {
    pub headless: bool,
    pub navigation_timeout_secs: u64,
    pub identities: IdentityPool,
    pub sources: Vec<SourceUrl>,
    pub card_selectors: Vec<String>,
    pub listing_fields: BTreeMap<Field, Vec<StrategySpec>>,
    pub detail_fields: BTreeMap<Field, Vec<StrategySpec>>,
    pub pagination: PaginationPlan,
    pub challenge: ChallengeConfig,
    /// Max detail pages visited per run.
    pub detail_limit: usize,
}

impl Default for SiteSessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: 30,
            identities: IdentityPool::default(),
            sources: Vec::new(),
            card_selectors: Vec::new(),
            listing_fields: BTreeMap::new(),
            detail_fields: BTreeMap::new(),
            pagination: PaginationPlan::default(),
            challenge: ChallengeConfig::default(),
            detail_limit: 40,
        }
    }
}

/// Run-wide settings layered onto every built-in site config.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteOverrides {
    pub headless: bool,
    pub navigation_timeout_secs: u64,
    pub max_pages: usize,
    pub detail_limit: usize,
}

impl Default for SiteOverrides {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: 30,
            max_pages: 5,
            detail_limit: 40,
        }
    }
}

impl SiteSessionConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs.max(1))
    }

    pub fn with_source(mut self, source: SourceUrl) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_cards(mut self, selectors: &[&str]) -> Self {
        self.card_selectors = selectors.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_field(mut self, field: Field, chain: Vec<StrategySpec>) -> Self {
        self.listing_fields.insert(field, chain);
        self
    }

    pub fn with_detail_field(mut self, field: Field, chain: Vec<StrategySpec>) -> Self {
        self.detail_fields.insert(field, chain);
        self
    }

    pub fn with_pagination(mut self, plan: PaginationPlan) -> Self {
        self.pagination = plan;
        self
    }

    pub fn apply_overrides(&mut self, overrides: &SiteOverrides) {
        self.headless = overrides.headless;
        self.navigation_timeout_secs = overrides.navigation_timeout_secs;
        self.pagination.max_pages = overrides.max_pages;
        self.detail_limit = overrides.detail_limit;
    }
}
