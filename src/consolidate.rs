// src/consolidate.rs

//! Cross-source de-duplication.
//!
//! Two listings are the same property when their keys match. The default key
//! (neighborhood + asking price) is an approximation; [`KeyStrategy`] is the
//! seam for something sharper.

use crate::domain::logic::normalize_text;
use crate::domain::Listing;
use serde_json::Value;
use std::collections::HashMap;
use std::hash::Hash;

/// Fields that every listing carries or that are added after consolidation;
/// they say nothing about how rich a record is.
const BOOKKEEPING: [&str; 5] = ["source_id", "source", "extraction_timestamp", "incomplete", "market"];

pub trait KeyStrategy {
    type Key: Eq + Hash;

    fn key(&self, listing: &Listing) -> Self::Key;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsolidationKey {
    pub neighborhood: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeighborhoodPriceKey;

impl KeyStrategy for NeighborhoodPriceKey {
    type Key = ConsolidationKey;

    fn key(&self, listing: &Listing) -> ConsolidationKey {
        ConsolidationKey {
            neighborhood: normalize_text(&listing.neighborhood),
            price_cents: (listing.asking_price * 100.0).round() as i64,
        }
    }
}

fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

/// How many attributes of the serialized listing carry information.
pub fn populated_field_count(listing: &Listing) -> usize {
    match serde_json::to_value(listing) {
        Ok(Value::Object(map)) => map
            .iter()
            .filter(|(k, _)| !BOOKKEEPING.contains(&k.as_str()))
            .filter(|(_, v)| is_populated(v))
            .count(),
        _ => 0,
    }
}

pub fn consolidate(listings: Vec<Listing>) -> Vec<Listing> {
    consolidate_by(listings, &NeighborhoodPriceKey)
}

/// Keeps one listing per key. A later listing replaces the kept one only if
/// it has strictly more populated fields, and it takes the kept one's place
/// in the output order. Incomplete listings (no extracted price) have no
/// trustworthy key and are passed through unmerged.
pub fn consolidate_by<S: KeyStrategy>(listings: Vec<Listing>, strategy: &S) -> Vec<Listing> {
    let mut slots: HashMap<S::Key, usize> = HashMap::new();
    let mut kept: Vec<(Listing, usize)> = Vec::with_capacity(listings.len());

    for listing in listings {
        let richness = populated_field_count(&listing);
        if listing.incomplete {
            kept.push((listing, richness));
            continue;
        }
        match slots.get(&strategy.key(&listing)) {
            Some(&slot) => {
                if richness > kept[slot].1 {
                    kept[slot] = (listing, richness);
                }
            }
            None => {
                slots.insert(strategy.key(&listing), kept.len());
                kept.push((listing, richness));
            }
        }
    }

    kept.into_iter().map(|(listing, _)| listing).collect()
}
