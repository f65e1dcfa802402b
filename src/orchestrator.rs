// src/orchestrator.rs

//! Runs every registered adapter, then normalizes, consolidates, filters and
//! prices what they found.

use crate::adapters::{run_adapter, AdapterRegistry, AdapterReport, RunOutcome, SearchQuery, SourceStats};
use crate::consolidate::consolidate;
use crate::domain::logic::{canonical_property_type, normalize_text};
use crate::domain::{AuctionRound, Listing, MarketEstimate};
use crate::market::{EstimateRequest, MarketAggregator};
use crate::normalize::{normalize_batch, NormalizeDefaults};
use crate::session::SessionManager;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Downstream filters applied after consolidation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestionFilters {
    pub max_price: Option<f64>,
    pub property_type: Option<String>,
    /// Empty means every city.
    pub city_allowlist: Vec<String>,
    pub auction_round: Option<AuctionRound>,
    /// Pushed down to sites that can filter by state.
    pub state: Option<String>,
}

impl IngestionFilters {
    pub fn accepts(&self, listing: &Listing) -> bool {
        if let Some(max) = self.max_price {
            // An unextracted price cannot be shown to be under the cap.
            if listing.incomplete || listing.asking_price > max {
                return false;
            }
        }
        if let Some(wanted) = &self.property_type {
            let canonical = canonical_property_type(wanted);
            let wanted = if canonical.is_empty() { normalize_text(wanted) } else { canonical };
            if listing.property_type != wanted {
                return false;
            }
        }
        if !self.city_allowlist.is_empty() {
            let city = normalize_text(&listing.city);
            if !self.city_allowlist.iter().any(|c| normalize_text(c) == city) {
                return false;
            }
        }
        if let Some(round) = self.auction_round {
            if listing.auction_round != round {
                return false;
            }
        }
        true
    }

    pub fn search_query(&self) -> SearchQuery {
        SearchQuery {
            state: self.state.clone(),
            property_type: self.property_type.clone(),
            max_price: self.max_price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Overall budget for adapter collection and market enrichment.
    pub deadline: Duration,
    /// How long cancelled adapters get to hand back partial results.
    pub grace: Duration,
    pub concurrent_adapters: bool,
    pub defaults: NormalizeDefaults,
    pub market_sources: Vec<String>,
    /// Listings priced at once.
    pub market_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(900),
            grace: Duration::from_secs(10),
            concurrent_adapters: true,
            defaults: NormalizeDefaults::default(),
            market_sources: vec!["zap".into(), "vivareal".into(), "quintoandar".into()],
            market_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    #[default]
    Completed,
    /// Some sources failed or the deadline cut the run short.
    Partial,
    /// No source produced a single listing; the empty result is not a real one.
    AllSourcesFailed,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub status: IngestStatus,
    pub all_sources_failed: bool,
    pub sources: BTreeMap<String, SourceStats>,
    pub raw_records: usize,
    pub normalization_errors: usize,
    pub duplicates_merged: usize,
    pub filtered_out: usize,
    pub market_fallbacks: usize,
    pub listings: usize,
    pub deadline_hit: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub listings: Vec<Listing>,
    pub stats: RunStats,
}

pub struct Orchestrator {
    registry: AdapterRegistry,
    sessions: SessionManager,
    aggregator: Arc<MarketAggregator>,
    settings: PipelineSettings,
}

struct Deadline {
    at: Instant,
    grace_until: Option<Instant>,
    aborted: bool,
}

impl Deadline {
    fn hit(&self) -> bool {
        self.grace_until.is_some()
    }
}

impl Orchestrator {
    pub fn new(
        registry: AdapterRegistry,
        sessions: SessionManager,
        aggregator: Arc<MarketAggregator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            registry,
            sessions,
            aggregator,
            settings,
        }
    }

    /// Waits for every spawned adapter. At the deadline the token is
    /// cancelled; after the grace period whatever is still running is aborted.
    async fn drain(
        &self,
        set: &mut JoinSet<AdapterReport>,
        cancel: &CancellationToken,
        deadline: &mut Deadline,
        reports: &mut Vec<AdapterReport>,
    ) {
        loop {
            let grace_at = deadline.grace_until.unwrap_or(deadline.at);
            tokio::select! {
                joined = set.join_next() => match joined {
                    None => return,
                    Some(Ok(report)) => reports.push(report),
                    Some(Err(e)) => warn!(error = %e, "adapter task ended without a report"),
                },
                _ = tokio::time::sleep_until(deadline.at), if !deadline.hit() => {
                    warn!(running = set.len(), "pipeline deadline reached; cancelling adapters");
                    cancel.cancel();
                    deadline.grace_until = Some(Instant::now() + self.settings.grace);
                }
                _ = tokio::time::sleep_until(grace_at), if deadline.hit() && !deadline.aborted => {
                    warn!(running = set.len(), "grace period over; aborting adapters");
                    deadline.aborted = true;
                    set.abort_all();
                }
            }
        }
    }

    async fn collect(&self, query: &SearchQuery, cancel: &CancellationToken, deadline: &mut Deadline) -> Vec<AdapterReport> {
        let mut reports = Vec::with_capacity(self.registry.len());
        let mut set = JoinSet::new();

        for adapter in self.registry.adapters() {
            if cancel.is_cancelled() {
                break;
            }
            set.spawn(run_adapter(
                Arc::clone(adapter),
                self.sessions.clone(),
                query.clone(),
                cancel.clone(),
            ));
            if !self.settings.concurrent_adapters {
                self.drain(&mut set, cancel, deadline, &mut reports).await;
            }
        }
        self.drain(&mut set, cancel, deadline, &mut reports).await;

        // Aborted or never started: report them as cancelled so every source
        // shows up in the stats.
        for name in self.registry.names() {
            if !reports.iter().any(|r| r.source == name) {
                reports.push(AdapterReport {
                    source: name,
                    records: Vec::new(),
                    stats: SourceStats {
                        outcome: RunOutcome::Cancelled,
                        ..Default::default()
                    },
                });
            }
        }

        // Registry order, so consolidation ties do not depend on timing.
        let order = self.registry.names();
        reports.sort_by_key(|r| order.iter().position(|n| *n == r.source).unwrap_or(usize::MAX));
        reports
    }

    async fn enrich(&self, listings: &mut [Listing], deadline: Instant) -> usize {
        let names = &self.settings.market_sources;
        let aggregator = &self.aggregator;

        let estimates: Vec<(usize, MarketEstimate)> = stream::iter(listings.iter().enumerate().map(|(i, listing)| {
            let request = EstimateRequest::from_listing(listing);
            async move {
                let estimate = match tokio::time::timeout_at(deadline, aggregator.estimate(&request, names)).await {
                    Ok(estimate) => estimate,
                    Err(_) => aggregator.fallback_estimate(&request),
                };
                (i, estimate)
            }
        }))
        .buffer_unordered(self.settings.market_concurrency.max(1))
        .collect()
        .await;

        let mut fallbacks = 0;
        for (i, estimate) in estimates {
            if estimate.used_fallback {
                fallbacks += 1;
            }
            listings[i].market = Some(estimate);
        }
        fallbacks
    }

    pub async fn run_ingestion(&self, filters: &IngestionFilters) -> IngestionReport {
        let started = Instant::now();
        let cancel = CancellationToken::new();
        let mut deadline = Deadline {
            at: started + self.settings.deadline,
            grace_until: None,
            aborted: false,
        };
        let mut stats = RunStats::default();

        info!(sources = ?self.registry.names(), "ingestion started");
        let reports = self.collect(&filters.search_query(), &cancel, &mut deadline).await;
        stats.deadline_hit = deadline.hit();

        let mut listings = Vec::new();
        for report in reports.iter() {
            let (normalized, rejected) = normalize_batch(&report.records, &report.source, &self.settings.defaults);
            let mut source_stats = report.stats.clone();
            source_stats.listings = normalized.len();
            stats.raw_records += report.records.len();
            stats.normalization_errors += rejected;
            stats.sources.insert(report.source.clone(), source_stats);
            listings.extend(normalized);
        }

        // No usable output at all, whatever each source reported: an empty
        // result must never pass for a real one.
        if listings.is_empty() {
            error!(
                sources = reports.len(),
                raw_records = stats.raw_records,
                "no source produced a listing this run"
            );
            stats.all_sources_failed = true;
            stats.status = IngestStatus::AllSourcesFailed;
            stats.elapsed_ms = started.elapsed().as_millis() as u64;
            return IngestionReport {
                listings: Vec::new(),
                stats,
            };
        }

        let before = listings.len();
        let mut listings = consolidate(listings);
        stats.duplicates_merged = before - listings.len();

        let before = listings.len();
        listings.retain(|l| filters.accepts(l));
        stats.filtered_out = before - listings.len();

        stats.market_fallbacks = self.enrich(&mut listings, deadline.at).await;

        stats.listings = listings.len();
        stats.status = if stats.deadline_hit || reports.iter().any(|r| r.stats.outcome.is_failure()) {
            IngestStatus::Partial
        } else {
            IngestStatus::Completed
        };
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            listings = stats.listings,
            duplicates = stats.duplicates_merged,
            filtered = stats.filtered_out,
            market_fallbacks = stats.market_fallbacks,
            status = ?stats.status,
            elapsed_ms = stats.elapsed_ms,
            "ingestion finished"
        );

        IngestionReport { listings, stats }
    }
}
