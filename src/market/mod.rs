// src/market/mod.rs

//! Fair-market estimates from live comparable listings, with a static
//! regional table when no live sample is available.

mod aggregator;
mod cache;
mod fallback;
pub mod sources;
mod stats;

pub use aggregator::MarketAggregator;
pub use cache::MarketCache;
pub use fallback::FallbackTable;
pub use stats::{median, summarize};

use crate::domain::logic::normalize_text;
use crate::domain::{Listing, MarketSample};
use crate::errors::MarketError;
use async_trait::async_trait;

/// What the aggregator is asked to price.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRequest {
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub property_type: String,
    pub bedrooms: u32,
    pub reference_area_m2: f64,
}

impl EstimateRequest {
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            neighborhood: listing.neighborhood.clone(),
            city: listing.city.clone(),
            state: listing.state.clone(),
            property_type: listing.property_type.clone(),
            bedrooms: listing.bedrooms,
            reference_area_m2: listing.reference_area(),
        }
    }

    /// Cache key; area is rounded to whole square meters.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            normalize_text(&self.neighborhood),
            normalize_text(&self.city),
            normalize_text(&self.property_type),
            self.reference_area_m2.max(0.0).round() as u64,
            self.bedrooms
        )
    }
}

/// A live listings site queried for comparables.
#[async_trait]
pub trait MarketSource: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self, request: &EstimateRequest) -> Result<Vec<MarketSample>, MarketError>;
}
