// src/tests/orchestrator_tests.rs
use super::utils::{card, listing, listing_page, quick_challenge, sessions_for, test_site_config, FakeWeb, CHALLENGE_PAGE};
use crate::adapters::caixa::CaixaAdapter;
use crate::adapters::mega_leiloes::MegaLeiloesAdapter;
use crate::adapters::resale::ResaleAdapter;
use crate::adapters::sold_leiloes::SoldLeiloesAdapter;
use crate::adapters::zuk::ZukAdapter;
use crate::adapters::{AdapterRegistry, RunOutcome, SiteSessionConfig};
use crate::domain::AuctionRound;
use crate::market::{FallbackTable, MarketAggregator, MarketCache};
use crate::orchestrator::{IngestStatus, IngestionFilters, Orchestrator, PipelineSettings};
use std::sync::Arc;
use std::time::Duration;

const CAIXA: &str = "https://caixa.test/lista";
const ZUK: &str = "https://zuk.test/lista";

fn no_market() -> Arc<MarketAggregator> {
    Arc::new(MarketAggregator::new(
        Vec::new(),
        Arc::new(MarketCache::new(Duration::from_secs(60))),
        FallbackTable::default(),
        Duration::from_millis(100),
    ))
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        deadline: Duration::from_secs(30),
        grace: Duration::from_millis(200),
        ..PipelineSettings::default()
    }
}

fn two_site_web() -> FakeWeb {
    FakeWeb::new()
        .page(
            CAIXA,
            listing_page(
                &[
                    card("/i/1", "Apartamento - Moema", "R$ 300.000,00", "Av. Ibirapuera, 10 - Moema - São Paulo/SP"),
                    card("/i/2", "Casa - Santana", "R$ 410.000,00", "Rua B, 2 - Santana - São Paulo/SP"),
                    card("/i/3", "Terreno - Centro", "R$ 95.000,00", "Rua C, 3 - Centro - Campinas - SP"),
                ],
                None,
            ),
        )
        .page(
            ZUK,
            listing_page(
                &[
                    // Same unit as caixa's first card.
                    card("/lote/77", "Apartamento em Moema", "R$ 300.000,00", "Av. Ibirapuera, 10 - moema - São Paulo/SP"),
                    card("/lote/78", "Apartamento em Pinheiros", "R$ 520.000,00", "Rua D, 4 - Pinheiros - São Paulo/SP"),
                ],
                None,
            ),
        )
}

fn two_sites(caixa_url: &str, zuk_url: &str) -> Result<AdapterRegistry, Box<dyn std::error::Error>> {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(CaixaAdapter::new(test_site_config(caixa_url))?));
    registry.register(Arc::new(ZukAdapter::new(test_site_config(zuk_url))?));
    Ok(registry)
}

#[tokio::test]
async fn sources_are_merged_and_priced() -> Result<(), Box<dyn std::error::Error>> {
    let web = Arc::new(two_site_web());
    let orchestrator = Orchestrator::new(two_sites(CAIXA, ZUK)?, sessions_for(&web), no_market(), settings());

    let report = orchestrator.run_ingestion(&IngestionFilters::default()).await;
    let stats = &report.stats;

    assert_eq!(stats.status, IngestStatus::Completed);
    assert!(!stats.all_sources_failed);
    assert!(!stats.deadline_hit);
    assert_eq!(stats.raw_records, 5);
    assert_eq!(stats.duplicates_merged, 1);
    assert_eq!(report.listings.len(), 4);
    assert_eq!(stats.listings, 4);
    assert_eq!(stats.sources["caixa"].listings, 3);
    assert_eq!(stats.sources["zuk"].listings, 2);

    // Equal completeness: the earlier source keeps the slot.
    let moema: Vec<_> = report.listings.iter().filter(|l| l.neighborhood == "Moema").collect();
    assert_eq!(moema.len(), 1);
    assert_eq!(moema[0].source, "caixa");

    assert_eq!(stats.market_fallbacks, 4);
    assert!(report.listings.iter().all(|l| l.market.as_ref().is_some_and(|m| m.estimated_value > 0.0)));
    assert_eq!(web.closed(), 2);
    Ok(())
}

#[tokio::test]
async fn sequential_run_gives_the_same_result() -> Result<(), Box<dyn std::error::Error>> {
    let web = Arc::new(two_site_web());
    let settings = PipelineSettings {
        concurrent_adapters: false,
        ..settings()
    };
    let orchestrator = Orchestrator::new(two_sites(CAIXA, ZUK)?, sessions_for(&web), no_market(), settings);

    let report = orchestrator.run_ingestion(&IngestionFilters::default()).await;

    assert_eq!(report.stats.status, IngestStatus::Completed);
    assert_eq!(report.listings.len(), 4);
    Ok(())
}

#[tokio::test]
async fn filters_apply_after_consolidation() -> Result<(), Box<dyn std::error::Error>> {
    let web = Arc::new(two_site_web());
    let orchestrator = Orchestrator::new(two_sites(CAIXA, ZUK)?, sessions_for(&web), no_market(), settings());

    let filters = IngestionFilters {
        max_price: Some(350_000.0),
        ..IngestionFilters::default()
    };
    let report = orchestrator.run_ingestion(&filters).await;

    assert_eq!(report.listings.len(), 2);
    assert_eq!(report.stats.filtered_out, 2);
    assert!(report.listings.iter().all(|l| l.asking_price <= 350_000.0));
    Ok(())
}

fn blocked(mut config: SiteSessionConfig) -> SiteSessionConfig {
    config.challenge = quick_challenge();
    config
}

#[tokio::test]
async fn every_source_blocked_is_not_an_empty_success() -> Result<(), Box<dyn std::error::Error>> {
    let web = Arc::new(FakeWeb::new().fallback(CHALLENGE_PAGE));
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(CaixaAdapter::new(blocked(CaixaAdapter::default_config()))?));
    registry.register(Arc::new(ZukAdapter::new(blocked(ZukAdapter::default_config()))?));
    registry.register(Arc::new(MegaLeiloesAdapter::new(blocked(MegaLeiloesAdapter::default_config()))?));
    registry.register(Arc::new(ResaleAdapter::new(blocked(ResaleAdapter::default_config()))?));
    registry.register(Arc::new(SoldLeiloesAdapter::new(blocked(SoldLeiloesAdapter::default_config()))?));
    let orchestrator = Orchestrator::new(registry, sessions_for(&web), no_market(), settings());

    let report = orchestrator.run_ingestion(&IngestionFilters::default()).await;

    assert!(report.listings.is_empty());
    assert!(report.stats.all_sources_failed);
    assert_eq!(report.stats.status, IngestStatus::AllSourcesFailed);
    assert_eq!(report.stats.sources.len(), 5);
    for (name, source) in &report.stats.sources {
        assert_eq!(source.outcome, RunOutcome::SourceBlocked, "{name}");
    }
    assert_eq!(web.closed(), 5);
    Ok(())
}

#[tokio::test]
async fn deadline_keeps_finished_sources() -> Result<(), Box<dyn std::error::Error>> {
    let web = Arc::new(two_site_web().latency("slow.test", Duration::from_secs(5)));
    let settings = PipelineSettings {
        deadline: Duration::from_millis(300),
        grace: Duration::from_millis(100),
        ..PipelineSettings::default()
    };
    let orchestrator = Orchestrator::new(
        two_sites(CAIXA, "https://slow.test/lista")?,
        sessions_for(&web),
        no_market(),
        settings,
    );

    let report = orchestrator.run_ingestion(&IngestionFilters::default()).await;

    assert!(report.stats.deadline_hit);
    assert_eq!(report.stats.status, IngestStatus::Partial);
    assert_eq!(report.stats.sources["zuk"].outcome, RunOutcome::Cancelled);
    assert_eq!(report.stats.sources["caixa"].outcome, RunOutcome::Success);
    assert_eq!(report.listings.len(), 3);
    assert!(report.stats.elapsed_ms < 2_000);
    // The aborted adapter's session is still closed.
    assert_eq!(web.closed(), 2);
    Ok(())
}

#[tokio::test]
async fn every_source_empty_is_not_an_empty_success() -> Result<(), Box<dyn std::error::Error>> {
    let web = Arc::new(
        FakeWeb::new()
            .page(CAIXA, listing_page(&[], None))
            .page(ZUK, listing_page(&[], None)),
    );
    let orchestrator = Orchestrator::new(two_sites(CAIXA, ZUK)?, sessions_for(&web), no_market(), settings());

    let report = orchestrator.run_ingestion(&IngestionFilters::default()).await;

    assert!(report.listings.is_empty());
    assert!(report.stats.all_sources_failed);
    assert_eq!(report.stats.status, IngestStatus::AllSourcesFailed);
    assert_eq!(report.stats.sources["caixa"].outcome, RunOutcome::Success);
    assert_eq!(report.stats.sources["zuk"].outcome, RunOutcome::Success);
    Ok(())
}

#[tokio::test]
async fn records_that_all_fail_normalization_are_not_a_success() -> Result<(), Box<dyn std::error::Error>> {
    // Cards without a link never become listings.
    let linkless = r#"<div class="card"><h2>Casa</h2><span class="price">R$ 100.000,00</span></div>"#.to_string();
    let web = Arc::new(
        FakeWeb::new()
            .page(CAIXA, listing_page(std::slice::from_ref(&linkless), None))
            .page(ZUK, listing_page(&[linkless], None)),
    );
    let orchestrator = Orchestrator::new(two_sites(CAIXA, ZUK)?, sessions_for(&web), no_market(), settings());

    let report = orchestrator.run_ingestion(&IngestionFilters::default()).await;

    assert!(report.listings.is_empty());
    assert_eq!(report.stats.status, IngestStatus::AllSourcesFailed);
    assert_eq!(report.stats.raw_records, 2);
    assert_eq!(report.stats.normalization_errors, 2);
    Ok(())
}

#[test]
fn filter_predicates() {
    let mut l = listing("caixa", "1", "Moema", 300_000.0);
    l.property_type = "apartamento".into();
    l.auction_round = AuctionRound::Second;

    assert!(IngestionFilters::default().accepts(&l));

    let cheap = IngestionFilters {
        max_price: Some(250_000.0),
        ..Default::default()
    };
    assert!(!cheap.accepts(&l));

    let unpriced = listing("caixa", "2", "Moema", 0.0);
    assert!(unpriced.incomplete);
    assert!(IngestionFilters::default().accepts(&unpriced));
    assert!(!cheap.accepts(&unpriced));

    let apartments = IngestionFilters {
        property_type: Some("Apto".into()),
        ..Default::default()
    };
    assert!(apartments.accepts(&l));
    let houses = IngestionFilters {
        property_type: Some("Casa".into()),
        ..Default::default()
    };
    assert!(!houses.accepts(&l));

    let cities = IngestionFilters {
        city_allowlist: vec!["sao paulo".into()],
        ..Default::default()
    };
    assert!(cities.accepts(&l));
    let elsewhere = IngestionFilters {
        city_allowlist: vec!["Campinas".into()],
        ..Default::default()
    };
    assert!(!elsewhere.accepts(&l));

    let first_round = IngestionFilters {
        auction_round: Some(AuctionRound::First),
        ..Default::default()
    };
    assert!(!first_round.accepts(&l));
}

#[test]
fn search_query_carries_pushdown_filters() {
    let filters = IngestionFilters {
        state: Some("SP".into()),
        max_price: Some(500_000.0),
        property_type: Some("casa".into()),
        ..Default::default()
    };
    let query = filters.search_query();
    assert_eq!(query.state.as_deref(), Some("SP"));
    assert_eq!(query.max_price, Some(500_000.0));
    assert_eq!(query.property_type.as_deref(), Some("casa"));
}
