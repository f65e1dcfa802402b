// src/tests/market_tests.rs
use super::utils::{request, FakeMarketSource};
use crate::domain::{Confidence, MarketSample};
use crate::market::sources::{glue, quintoandar, Portal};
use crate::market::{median, summarize, FallbackTable, MarketAggregator, MarketCache, MarketSource};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn aggregator(sources: Vec<Arc<dyn MarketSource>>, ttl: Duration) -> MarketAggregator {
    MarketAggregator::new(
        sources,
        Arc::new(MarketCache::new(ttl)),
        FallbackTable::default(),
        Duration::from_millis(200),
    )
}

fn samples(source: &str, n: usize) -> Vec<MarketSample> {
    (0..n)
        .map(|i| MarketSample::new(source, 500_000.0 + 10_000.0 * i as f64, 50.0))
        .collect()
}

#[tokio::test]
async fn no_sources_uses_regional_table() {
    let agg = aggregator(Vec::new(), Duration::from_secs(60));
    let est = agg.estimate(&request("Vila Mariana", "São Paulo", "Apartamento", 2, 50.0), &[]).await;

    assert!(est.used_fallback);
    assert_eq!(est.confidence, Confidence::Low);
    assert_eq!(est.sample_count, 0);
    assert!((est.mean_price_per_area - 12_000.0).abs() < 1e-6);
    assert!((est.estimated_value - 600_000.0).abs() < 1e-6);
    assert!(est.min_price < est.estimated_value && est.estimated_value < est.max_price);
    // Table estimates are never cached.
    assert!(agg.cache().is_empty());
}

#[tokio::test]
async fn failing_source_falls_back() {
    let agg = aggregator(vec![Arc::new(FakeMarketSource::failing("zap"))], Duration::from_secs(60));
    let est = agg.estimate(&request("Moema", "São Paulo", "Casa", 3, 120.0), &[]).await;
    assert!(est.used_fallback);
    assert!(est.estimated_value > 0.0);
}

#[tokio::test]
async fn slow_source_is_abandoned() {
    let slow = FakeMarketSource::new("zap", samples("zap", 3)).slow(Duration::from_secs(2));
    let agg = aggregator(vec![Arc::new(slow)], Duration::from_secs(60));
    let est = agg.estimate(&request("Moema", "São Paulo", "Apartamento", 2, 60.0), &[]).await;
    assert!(est.used_fallback);
}

#[tokio::test]
async fn live_samples_are_summarized_and_pooled() {
    let agg = aggregator(
        vec![
            Arc::new(FakeMarketSource::new("zap", samples("zap", 3))),
            Arc::new(FakeMarketSource::failing("vivareal")),
            Arc::new(FakeMarketSource::new("quintoandar", samples("quintoandar", 2))),
        ],
        Duration::from_secs(60),
    );
    let est = agg.estimate(&request("Moema", "São Paulo", "Apartamento", 2, 50.0), &[]).await;

    assert!(!est.used_fallback);
    assert_eq!(est.sample_count, 5);
    assert_eq!(est.sources, vec!["quintoandar", "zap"]);
    assert_eq!(est.confidence, Confidence::Medium);
    assert!(est.min_price <= est.median_price && est.median_price <= est.max_price);
    assert!(est.mean_price_per_area > 0.0);
    assert!((est.estimated_value - est.mean_price_per_area * 50.0).abs() < 1e-6);
}

#[tokio::test]
async fn ten_samples_is_high_confidence() {
    let agg = aggregator(vec![Arc::new(FakeMarketSource::new("zap", samples("zap", 10)))], Duration::from_secs(60));
    let est = agg.estimate(&request("Moema", "São Paulo", "Apartamento", 2, 50.0), &[]).await;
    assert_eq!(est.confidence, Confidence::High);
}

#[tokio::test]
async fn source_selection_by_name() {
    let zap = FakeMarketSource::new("zap", samples("zap", 2));
    let quinto = FakeMarketSource::new("quintoandar", samples("quintoandar", 2));
    let quinto_calls = quinto.calls();
    let agg = aggregator(vec![Arc::new(zap), Arc::new(quinto)], Duration::from_secs(60));

    let est = agg
        .estimate(&request("Moema", "São Paulo", "Apartamento", 2, 50.0), &["zap".to_string()])
        .await;
    assert_eq!(est.sources, vec!["zap"]);
    assert_eq!(quinto_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cache_serves_repeat_requests() {
    let source = FakeMarketSource::new("zap", samples("zap", 3));
    let calls = source.calls();
    let agg = aggregator(vec![Arc::new(source)], Duration::from_secs(60));

    let first = agg.estimate(&request("Moema", "São Paulo", "Apartamento", 2, 50.0), &[]).await;
    // Same key after normalization and area rounding.
    let second = agg.estimate(&request("  moema", "SAO PAULO", "apartamento", 2, 50.3), &[]).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
    assert_eq!(agg.cache().len(), 1);
}

#[tokio::test]
async fn expired_entries_are_requeried() {
    let source = FakeMarketSource::new("zap", samples("zap", 3));
    let calls = source.calls();
    let agg = aggregator(vec![Arc::new(source)], Duration::ZERO);

    let req = request("Moema", "São Paulo", "Apartamento", 2, 50.0);
    agg.estimate(&req, &[]).await;
    agg.estimate(&req, &[]).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(agg.cache().purge_expired(), 1);
    assert!(agg.cache().is_empty());
}

#[test]
fn summary_without_sample_areas_uses_reference_area() {
    let pool = vec![MarketSample::new("zap", 400_000.0, 0.0), MarketSample::new("zap", 600_000.0, 0.0)];
    let est = summarize(&pool, 100.0).expect("priced samples");
    assert!((est.mean_price - 500_000.0).abs() < 1e-6);
    assert!((est.mean_price_per_area - 5_000.0).abs() < 1e-6);
    assert!((est.estimated_value - 500_000.0).abs() < 1e-6);
}

#[test]
fn summary_without_reference_area_reports_mean_price() {
    let pool = vec![MarketSample::new("zap", 300_000.0, 60.0), MarketSample::new("zap", 500_000.0, 100.0)];
    let est = summarize(&pool, 0.0).expect("priced samples");
    assert!((est.estimated_value - 400_000.0).abs() < 1e-6);
    assert_eq!(est.reference_area_m2, 0.0);
}

#[test]
fn summary_needs_some_area() {
    let pool = vec![MarketSample::new("zap", 500_000.0, 0.0), MarketSample::new("zap", 600_000.0, 0.0)];
    assert!(summarize(&pool, 0.0).is_none());
}

#[tokio::test]
async fn arealess_samples_and_subject_use_the_table() {
    let source = FakeMarketSource::new(
        "zap",
        vec![MarketSample::new("zap", 500_000.0, 0.0), MarketSample::new("zap", 600_000.0, 0.0)],
    );
    let agg = aggregator(vec![Arc::new(source)], Duration::from_secs(60));
    let est = agg.estimate(&request("Vila Mariana", "São Paulo", "Apartamento", 2, 0.0), &[]).await;

    assert!(est.used_fallback);
    assert!(est.mean_price_per_area > 0.0);
    assert!(agg.cache().is_empty());
}

#[test]
fn unpriced_pool_has_no_summary() {
    assert!(summarize(&[], 50.0).is_none());
    assert!(summarize(&[MarketSample::new("zap", 0.0, 50.0)], 50.0).is_none());
}

#[test]
fn median_of_even_and_odd_pools() {
    assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    assert_eq!(median(&[]), 0.0);
}

#[test]
fn table_lookup_order() {
    let table = FallbackTable::default();
    assert_eq!(table.base_price_per_m2("São Paulo", "Vila Mariana"), 12_000.0);
    assert_eq!(table.base_price_per_m2("sao paulo", "Bairro Desconhecido"), 10_500.0);
    assert_eq!(table.base_price_per_m2("Cidade Nenhuma", "Centro"), 6_000.0);

    let custom = FallbackTable::empty(1_000.0)
        .with_city("Campinas", 2_000.0)
        .with_neighborhood("Campinas", "Cambuí", 3_000.0);
    assert_eq!(custom.base_price_per_m2("campinas", "cambui"), 3_000.0);
    assert_eq!(custom.base_price_per_m2("CAMPINAS", "Taquaral"), 2_000.0);
    assert_eq!(custom.base_price_per_m2("Sorocaba", ""), 1_000.0);
}

#[test]
fn table_adjusts_for_type() {
    let table = FallbackTable::empty(10_000.0);
    let apt = table.estimate(&request("", "X", "Apartamento", 2, 100.0));
    let land = table.estimate(&request("", "X", "Terreno", 0, 100.0));
    assert!((apt.estimated_value - 1_000_000.0).abs() < 1e-6);
    assert!(land.estimated_value < apt.estimated_value);
    assert!((apt.min_price - 850_000.0).abs() < 1e-6);
    assert!((apt.max_price - 1_150_000.0).abs() < 1e-6);
}

#[test]
fn glue_payload_parses_sale_listings() -> Result<(), Box<dyn std::error::Error>> {
    let body = r#"{
      "search": {"result": {"listings": [
        {"listing": {"usableAreas": [70], "bedrooms": [2], "unitTypes": ["APARTMENT"],
                     "pricingInfos": [{"price": "700000", "businessType": "SALE"}],
                     "address": {"city": "São Paulo", "neighborhood": "Moema", "street": "Av. Ibirapuera"}},
         "link": {"href": "/imovel/123"}},
        {"listing": {"usableAreas": [50],
                     "pricingInfos": [{"price": 3000, "businessType": "RENTAL"}]}},
        {"listing": {"totalAreas": [200],
                     "pricingInfos": [{"price": 450000}]}}
      ]}}
    }"#;

    let samples = glue::parse_response(Portal::VivaReal, body)?;
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].source, "vivareal");
    assert_eq!(samples[0].price, 700_000.0);
    assert_eq!(samples[0].price_per_m2, 10_000.0);
    assert_eq!(samples[0].bedrooms, Some(2));
    assert_eq!(samples[0].neighborhood, "Moema");
    assert_eq!(samples[0].url, "https://www.vivareal.com.br/imovel/123");
    assert_eq!(samples[1].area_m2, 200.0);

    assert!(glue::parse_response(Portal::Zap, "<html>").is_err());
    assert!(glue::parse_response(Portal::Zap, "{}")?.is_empty());
    Ok(())
}

#[test]
fn quintoandar_page_data_is_searched() -> Result<(), Box<dyn std::error::Error>> {
    let html = r#"<html><body><script id="__NEXT_DATA__" type="application/json">
      {"props": {"pageProps": {"initialState": {"houses": {
        "a1": {"id": "893", "salePrice": 550000, "area": 55, "bedrooms": 2, "neighbourhood": "Vila Mariana", "city": "São Paulo"},
        "a2": {"id": 894, "rentPrice": 3500, "area": 40}
      }}}}}
    </script></body></html>"#;

    let samples = quintoandar::parse_page(html)?;
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].price, 550_000.0);
    assert_eq!(samples[0].area_m2, 55.0);
    assert_eq!(samples[0].neighborhood, "Vila Mariana");
    assert_eq!(samples[0].url, "https://www.quintoandar.com.br/imovel/893");

    assert!(quintoandar::parse_page("<html></html>").is_err());
    Ok(())
}

#[test]
fn quintoandar_search_url_is_slugged() {
    let url = quintoandar::search_url(&request("Vila Mariana", "São Paulo", "Apartamento", 2, 50.0));
    assert_eq!(url, "https://www.quintoandar.com.br/comprar/imovel/vila-mariana-sao-paulo-sp-brasil");
    let url = quintoandar::search_url(&request("", "Campinas", "Casa", 0, 0.0));
    assert_eq!(url, "https://www.quintoandar.com.br/comprar/imovel/campinas-sp-brasil");
}
