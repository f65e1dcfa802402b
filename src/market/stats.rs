// src/market/stats.rs

use crate::domain::{Confidence, MarketEstimate, MarketSample};

/// Samples needed before an estimate is reported with high confidence.
pub const HIGH_CONFIDENCE_SAMPLES: usize = 10;

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Statistics over a non-empty pool of live samples; `None` when there is
/// nothing priced to summarize, or when no price per m² can be derived
/// (no sample area and no reference area).
pub fn summarize(samples: &[MarketSample], reference_area_m2: f64) -> Option<MarketEstimate> {
    let priced: Vec<&MarketSample> = samples.iter().filter(|s| s.price > 0.0).collect();
    if priced.is_empty() {
        return None;
    }

    let prices: Vec<f64> = priced.iter().map(|s| s.price).collect();
    let per_area: Vec<f64> = priced
        .iter()
        .filter(|s| s.area_m2 > 0.0)
        .map(|s| s.price / s.area_m2)
        .collect();

    let mean_price = mean(&prices);
    let (mean_ppa, median_ppa) = if per_area.is_empty() {
        // No sample has an area; fall back to the subject's own area.
        if reference_area_m2 <= 0.0 {
            return None;
        }
        (mean_price / reference_area_m2, median(&prices) / reference_area_m2)
    } else {
        (mean(&per_area), median(&per_area))
    };

    let estimated_value = if reference_area_m2 > 0.0 {
        mean_ppa * reference_area_m2
    } else {
        mean_price
    };

    let mut sources: Vec<String> = priced.iter().map(|s| s.source.clone()).collect();
    sources.sort();
    sources.dedup();

    Some(MarketEstimate {
        mean_price,
        median_price: median(&prices),
        min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
        max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean_price_per_area: mean_ppa,
        median_price_per_area: median_ppa,
        estimated_value,
        reference_area_m2: reference_area_m2.max(0.0),
        sample_count: priced.len(),
        sources,
        confidence: if priced.len() >= HIGH_CONFIDENCE_SAMPLES {
            Confidence::High
        } else {
            Confidence::Medium
        },
        used_fallback: false,
    })
}
