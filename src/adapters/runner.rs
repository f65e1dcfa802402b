// src/adapters/runner.rs

//! Executes one adapter end to end inside its own session.

use crate::adapters::{SearchQuery, SiteAdapter};
use crate::domain::{Field, RawExtraction};
use crate::errors::ScrapeError;
use crate::session::{Session, SessionManager};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    #[default]
    Success,
    PartialFailure,
    SourceBlocked,
    Cancelled,
    Failed,
}

impl RunOutcome {
    /// Outcomes that leave the source without usable results of its own.
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::SourceBlocked | RunOutcome::Failed | RunOutcome::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Idle,
    SessionAcquired,
    ListingCollected,
    DetailsCollected,
    Released(RunOutcome),
}

/// Logs the run's progress through its states.
#[derive(Debug)]
struct StateTracker<'a> {
    source: &'a str,
    state: AdapterState,
}

impl<'a> StateTracker<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            state: AdapterState::Idle,
        }
    }

    fn advance(&mut self, next: AdapterState) {
        debug!(source = self.source, from = ?self.state, to = ?next, "adapter state");
        self.state = next;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceStats {
    pub pages_visited: usize,
    pub raw_records: usize,
    /// Filled in after normalization.
    pub listings: usize,
    pub extraction_errors: usize,
    pub detail_errors: usize,
    pub outcome: RunOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct AdapterReport {
    pub source: String,
    pub records: Vec<RawExtraction>,
    pub stats: SourceStats,
}

struct Collected {
    records: Vec<RawExtraction>,
    stats: SourceStats,
    reached: AdapterState,
}

async fn collect(
    adapter: Arc<dyn SiteAdapter>,
    session: &mut Session,
    query: SearchQuery,
    cancel: CancellationToken,
) -> Result<Collected, ScrapeError> {
    let mut stats = SourceStats::default();

    let listing = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            stats.outcome = RunOutcome::Cancelled;
            return Ok(Collected { records: Vec::new(), stats, reached: AdapterState::SessionAcquired });
        }
        page = adapter.collect_listing_page(session, &query) => page?,
    };

    let mut records = listing.records;
    stats.pages_visited = listing.pages_visited;
    stats.extraction_errors = listing.extraction_errors;
    stats.raw_records = records.len();

    if let Some(reason) = listing.blocked {
        stats.outcome = RunOutcome::SourceBlocked;
        stats.error = Some(reason);
        return Ok(Collected { records, stats, reached: AdapterState::ListingCollected });
    }

    info!(source = adapter.name(), records = records.len(), pages = stats.pages_visited, "listing collected");

    if !adapter.wants_details() {
        stats.outcome = outcome_for(&stats);
        return Ok(Collected { records, stats, reached: AdapterState::ListingCollected });
    }

    let limiter = session.limiter();
    let limit = adapter.config().detail_limit;
    let mut visited = 0;
    let mut stopped = None;
    for record in records.iter_mut() {
        if visited >= limit {
            break;
        }
        let Some(url) = record.get(Field::Url).map(str::to_string) else {
            continue;
        };
        if visited > 0 {
            limiter.pause().await;
        }
        visited += 1;

        let detail = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                stopped = Some(RunOutcome::Cancelled);
                break;
            }
            detail = adapter.collect_detail(session, &url) => detail,
        };

        match detail {
            Ok(detail) => record.merge_from(detail),
            Err(e @ ScrapeError::SourceBlocked { .. }) => {
                warn!(source = adapter.name(), url = %url, error = %e, "blocked during details");
                stats.error = Some(e.to_string());
                stopped = Some(RunOutcome::SourceBlocked);
                break;
            }
            Err(e) => {
                debug!(source = adapter.name(), url = %url, error = %e, "detail page failed; keeping card fields");
                stats.detail_errors += 1;
            }
        }
    }

    let reached = match stopped {
        Some(outcome) => {
            stats.outcome = outcome;
            AdapterState::ListingCollected
        }
        None => {
            stats.outcome = outcome_for(&stats);
            AdapterState::DetailsCollected
        }
    };
    Ok(Collected { records, stats, reached })
}

fn outcome_for(stats: &SourceStats) -> RunOutcome {
    if stats.extraction_errors > 0 || stats.detail_errors > 0 {
        RunOutcome::PartialFailure
    } else {
        RunOutcome::Success
    }
}

/// Runs `adapter` to completion. Never fails: every path ends in a report
/// whose outcome says how far it got, and the session is always released.
pub async fn run_adapter(
    adapter: Arc<dyn SiteAdapter>,
    sessions: SessionManager,
    query: SearchQuery,
    cancel: CancellationToken,
) -> AdapterReport {
    let started = Instant::now();
    let source = adapter.name().to_string();
    let mut tracker = StateTracker::new(&source);

    let body_adapter = Arc::clone(&adapter);
    let body_cancel = cancel.clone();
    let result = sessions
        .with_session(&source, adapter.config(), &cancel, move |session| {
            Box::pin(collect(body_adapter, session, query, body_cancel))
        })
        .await;

    let (records, mut stats) = match result {
        Ok(collected) => {
            tracker.advance(AdapterState::SessionAcquired);
            if collected.reached != AdapterState::SessionAcquired {
                tracker.advance(AdapterState::ListingCollected);
            }
            if collected.reached == AdapterState::DetailsCollected {
                tracker.advance(AdapterState::DetailsCollected);
            }
            (collected.records, collected.stats)
        }
        Err(ScrapeError::Cancelled) => {
            let stats = SourceStats {
                outcome: RunOutcome::Cancelled,
                ..Default::default()
            };
            (Vec::new(), stats)
        }
        Err(e) => {
            warn!(source = %source, error = %e, "adapter run failed");
            let stats = SourceStats {
                outcome: if e.is_blocked() { RunOutcome::SourceBlocked } else { RunOutcome::Failed },
                error: Some(e.to_string()),
                ..Default::default()
            };
            (Vec::new(), stats)
        }
    };

    stats.elapsed_ms = started.elapsed().as_millis() as u64;
    tracker.advance(AdapterState::Released(stats.outcome));
    info!(
        source = %source,
        outcome = ?stats.outcome,
        records = records.len(),
        extraction_errors = stats.extraction_errors,
        detail_errors = stats.detail_errors,
        elapsed_ms = stats.elapsed_ms,
        "adapter finished"
    );

    AdapterReport { source, records, stats }
}
