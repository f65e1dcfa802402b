// src/market/fallback.rs

use crate::domain::logic::{canonical_property_type, normalize_text};
use crate::domain::{Confidence, MarketEstimate};
use crate::market::EstimateRequest;
use std::collections::HashMap;

/// Width of the min/max band around a table estimate.
pub const FALLBACK_BAND: f64 = 0.15;

const GLOBAL_PRICE_PER_M2: f64 = 6_000.0;

/// Reference prices per m² (R$) by city.
const CITIES: &[(&str, f64)] = &[
    ("sao paulo", 10_500.0),
    ("rio de janeiro", 9_800.0),
    ("brasilia", 9_500.0),
    ("curitiba", 8_500.0),
    ("belo horizonte", 8_200.0),
    ("florianopolis", 10_200.0),
    ("porto alegre", 7_500.0),
    ("campinas", 7_000.0),
    ("recife", 6_800.0),
    ("fortaleza", 6_500.0),
    ("salvador", 6_300.0),
    ("goiania", 6_200.0),
];

/// Neighborhoods keyed within their city.
const NEIGHBORHOODS: &[(&str, &str, f64)] = &[
    ("sao paulo", "itaim bibi", 16_000.0),
    ("sao paulo", "jardim paulista", 15_000.0),
    ("sao paulo", "moema", 14_500.0),
    ("sao paulo", "pinheiros", 13_500.0),
    ("sao paulo", "vila mariana", 12_000.0),
    ("sao paulo", "perdizes", 11_500.0),
    ("sao paulo", "santana", 9_500.0),
    ("sao paulo", "tatuape", 9_000.0),
    ("sao paulo", "butanta", 9_000.0),
    ("sao paulo", "mooca", 8_500.0),
    ("sao paulo", "centro", 8_000.0),
    ("sao paulo", "itaquera", 5_500.0),
    ("rio de janeiro", "leblon", 22_000.0),
    ("rio de janeiro", "ipanema", 20_000.0),
    ("rio de janeiro", "copacabana", 13_000.0),
    ("rio de janeiro", "barra da tijuca", 11_000.0),
    ("rio de janeiro", "tijuca", 8_500.0),
    ("rio de janeiro", "campo grande", 4_000.0),
];

/// Static regional price table consulted when no live sample exists.
#[derive(Debug, Clone)]
pub struct FallbackTable {
    global: f64,
    cities: HashMap<String, f64>,
    neighborhoods: HashMap<(String, String), f64>,
}

fn type_multiplier(property_type: &str) -> f64 {
    match canonical_property_type(property_type).as_str() {
        "apartamento" => 1.0,
        "sobrado" => 0.9,
        "casa" => 0.85,
        "comercial" => 0.95,
        "galpao" => 0.6,
        "terreno" => 0.45,
        "rural" => 0.25,
        _ => 1.0,
    }
}

/// Smaller units sell for more per m².
fn bedroom_multiplier(bedrooms: u32) -> f64 {
    match bedrooms {
        0 => 1.0,
        1 => 1.05,
        2 => 1.0,
        3 => 0.97,
        _ => 0.95,
    }
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self {
            global: GLOBAL_PRICE_PER_M2,
            cities: CITIES.iter().map(|(c, p)| (c.to_string(), *p)).collect(),
            neighborhoods: NEIGHBORHOODS
                .iter()
                .map(|(c, n, p)| ((c.to_string(), n.to_string()), *p))
                .collect(),
        }
    }
}

impl FallbackTable {
    pub fn empty(global_price_per_m2: f64) -> Self {
        Self {
            global: global_price_per_m2,
            cities: HashMap::new(),
            neighborhoods: HashMap::new(),
        }
    }

    pub fn with_city(mut self, city: &str, price_per_m2: f64) -> Self {
        self.cities.insert(normalize_text(city), price_per_m2);
        self
    }

    pub fn with_neighborhood(mut self, city: &str, neighborhood: &str, price_per_m2: f64) -> Self {
        self.neighborhoods
            .insert((normalize_text(city), normalize_text(neighborhood)), price_per_m2);
        self
    }

    /// Base price per m²: neighborhood, then city, then global default.
    pub fn base_price_per_m2(&self, city: &str, neighborhood: &str) -> f64 {
        let city = normalize_text(city);
        let neighborhood = normalize_text(neighborhood);
        self.neighborhoods
            .get(&(city.clone(), neighborhood))
            .or_else(|| self.cities.get(&city))
            .copied()
            .unwrap_or(self.global)
    }

    pub fn estimate(&self, request: &EstimateRequest) -> MarketEstimate {
        let ppa = self.base_price_per_m2(&request.city, &request.neighborhood)
            * type_multiplier(&request.property_type)
            * bedroom_multiplier(request.bedrooms);
        let area = request.reference_area_m2.max(0.0);
        let value = ppa * area;

        MarketEstimate {
            mean_price: value,
            median_price: value,
            min_price: value * (1.0 - FALLBACK_BAND),
            max_price: value * (1.0 + FALLBACK_BAND),
            mean_price_per_area: ppa,
            median_price_per_area: ppa,
            estimated_value: value,
            reference_area_m2: area,
            sample_count: 0,
            sources: Vec::new(),
            confidence: Confidence::Low,
            used_fallback: true,
        }
    }
}
