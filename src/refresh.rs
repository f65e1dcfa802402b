// src/refresh.rs

//! When a feed should be fetched again.

use crate::domain::Listing;
use crate::errors::ConfigError;
use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// What was fetched last time for one feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub feed: String,
    pub last_update: Option<DateTime<Utc>>,
    pub item_count: usize,
    pub content_hash: String,
}

impl CacheMetadata {
    pub fn new(feed: &str, last_update: DateTime<Utc>, item_count: usize, content_hash: String) -> Self {
        Self {
            feed: feed.to_string(),
            last_update: Some(last_update),
            item_count,
            content_hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPolicy {
    pub interval_days: i64,
    pub weekdays: Vec<Weekday>,
    /// Calendar days are compared in this offset (Brasília, UTC-3).
    pub offset: FixedOffset,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval_days: 3,
            weekdays: vec![Weekday::Mon, Weekday::Thu],
            offset: brasilia(),
        }
    }
}

fn brasilia() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).unwrap_or_else(|| Utc.fix())
}

impl RefreshPolicy {
    pub fn new(interval_days: i64, weekdays: Vec<Weekday>) -> Self {
        Self {
            interval_days,
            weekdays,
            ..Self::default()
        }
    }

    /// Due when never fetched, when the interval has elapsed, or when today
    /// is a scheduled weekday and the last fetch was not today.
    pub fn is_due(&self, meta: Option<&CacheMetadata>, now: DateTime<Utc>) -> bool {
        let Some(last) = meta.and_then(|m| m.last_update) else {
            return true;
        };
        if now - last >= Duration::days(self.interval_days) {
            return true;
        }
        let today = now.with_timezone(&self.offset);
        let last_day = last.with_timezone(&self.offset).date_naive();
        self.weekdays.contains(&today.weekday()) && last_day != today.date_naive()
    }
}

fn weekday(token: &str) -> Option<Weekday> {
    let token = token.trim().to_lowercase();
    if let Ok(day) = token.parse::<Weekday>() {
        return Some(day);
    }
    let prefix: String = token.chars().take(3).collect();
    match prefix.as_str() {
        "seg" => Some(Weekday::Mon),
        "ter" => Some(Weekday::Tue),
        "qua" => Some(Weekday::Wed),
        "qui" => Some(Weekday::Thu),
        "sex" => Some(Weekday::Fri),
        "sab" | "sáb" => Some(Weekday::Sat),
        "dom" => Some(Weekday::Sun),
        _ => None,
    }
}

/// "mon,thu" or "seg,qui".
pub fn parse_weekdays(raw: &str) -> Result<Vec<Weekday>, ConfigError> {
    raw.split(',')
        .filter(|t| !t.trim().is_empty())
        .map(|t| {
            weekday(t).ok_or_else(|| ConfigError::Invalid {
                key: "REFRESH_WEEKDAYS".to_string(),
                reason: format!("unknown weekday `{}`", t.trim()),
            })
        })
        .collect()
}

/// sha256 over the listing set, independent of order and of fields that
/// change on every run.
pub fn content_hash(listings: &[Listing]) -> String {
    let mut rows: Vec<String> = listings
        .iter()
        .filter_map(|l| match serde_json::to_value(l) {
            Ok(Value::Object(mut map)) => {
                map.remove("extraction_timestamp");
                map.remove("market");
                serde_json::to_string(&map).ok()
            }
            _ => None,
        })
        .collect();
    rows.sort();

    let mut hasher = Sha256::new();
    for row in &rows {
        hasher.update(row.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}
