// src/domain/market.rs

use serde::{Deserialize, Serialize};

/// One comparable listing pulled from a live market source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSample {
    pub source: String,
    pub address: String,
    pub neighborhood: String,
    pub city: String,
    pub price: f64,
    pub area_m2: f64,
    pub price_per_m2: f64,
    pub bedrooms: Option<u32>,
    pub property_type: String,
    pub url: String,
}

impl MarketSample {
    pub fn new(source: &str, price: f64, area_m2: f64) -> Self {
        Self {
            source: source.to_string(),
            address: String::new(),
            neighborhood: String::new(),
            city: String::new(),
            price,
            area_m2,
            price_per_m2: derive_price_per_m2(price, area_m2),
            bedrooms: None,
            property_type: String::new(),
            url: String::new(),
        }
    }
}

pub fn derive_price_per_m2(price: f64, area_m2: f64) -> f64 {
    if price > 0.0 && area_m2 > 0.0 {
        price / area_m2
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Aggregated fair-value assessment. Always fully populated, whether it came
/// from live samples or from the static regional table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEstimate {
    pub mean_price: f64,
    pub median_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub mean_price_per_area: f64,
    pub median_price_per_area: f64,
    pub estimated_value: f64,
    pub reference_area_m2: f64,
    pub sample_count: usize,
    pub sources: Vec<String>,
    pub confidence: Confidence,
    pub used_fallback: bool,
}
