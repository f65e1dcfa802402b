// src/market/cache.rs

use crate::domain::MarketEstimate;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Read/write-through estimate cache with a fixed time-to-live.
///
/// Advisory: a poisoned lock behaves like a miss, never like an error.
#[derive(Debug)]
pub struct MarketCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, MarketEstimate)>>,
}

impl MarketCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<MarketEstimate> {
        let entries = self.entries.read().ok()?;
        let (stored, estimate) = entries.get(key)?;
        if stored.elapsed() >= self.ttl {
            return None;
        }
        Some(estimate.clone())
    }

    pub fn insert(&self, key: String, estimate: MarketEstimate) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, (Instant::now(), estimate));
        }
    }

    /// Drops expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MarketCache {
    /// Six hours.
    fn default() -> Self {
        Self::new(Duration::from_secs(6 * 60 * 60))
    }
}
