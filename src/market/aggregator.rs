// src/market/aggregator.rs

use crate::domain::{MarketEstimate, MarketSample};
use crate::errors::MarketError;
use crate::market::{summarize, EstimateRequest, FallbackTable, MarketCache, MarketSource};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct MarketAggregator {
    sources: Vec<Arc<dyn MarketSource>>,
    cache: Arc<MarketCache>,
    fallback: FallbackTable,
    query_timeout: Duration,
}

impl MarketAggregator {
    pub fn new(
        sources: Vec<Arc<dyn MarketSource>>,
        cache: Arc<MarketCache>,
        fallback: FallbackTable,
        query_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            cache,
            fallback,
            query_timeout,
        }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn cache(&self) -> &Arc<MarketCache> {
        &self.cache
    }

    /// Table estimate without touching any live source.
    pub fn fallback_estimate(&self, request: &EstimateRequest) -> MarketEstimate {
        self.fallback.estimate(request)
    }

    async fn query_one(&self, source: &Arc<dyn MarketSource>, request: &EstimateRequest) -> Vec<MarketSample> {
        let result = match tokio::time::timeout(self.query_timeout, source.query(request)).await {
            Ok(result) => result,
            Err(_) => Err(MarketError::Timeout {
                site: source.name().to_string(),
            }),
        };
        match result {
            Ok(samples) => {
                debug!(source = source.name(), samples = samples.len(), "market query done");
                samples
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "market query failed");
                Vec::new()
            }
        }
    }

    /// Estimate from the named live sources (all of them when `names` is
    /// empty), queried concurrently. Always returns a complete estimate: the
    /// static table stands in when no source contributes a sample.
    pub async fn estimate(&self, request: &EstimateRequest, names: &[String]) -> MarketEstimate {
        let key = request.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            debug!(key = %key, "market cache hit");
            return hit;
        }

        let selected: Vec<&Arc<dyn MarketSource>> = self
            .sources
            .iter()
            .filter(|s| names.is_empty() || names.iter().any(|n| n == s.name()))
            .collect();

        let pool: Vec<MarketSample> = join_all(selected.iter().map(|s| self.query_one(s, request)))
            .await
            .into_iter()
            .flatten()
            .collect();

        match summarize(&pool, request.reference_area_m2) {
            Some(estimate) => {
                self.cache.insert(key, estimate.clone());
                estimate
            }
            None => {
                debug!(
                    neighborhood = %request.neighborhood,
                    city = %request.city,
                    "no live samples; using regional table"
                );
                // Not cached, so a source that recovers is tried again.
                self.fallback.estimate(request)
            }
        }
    }
}
