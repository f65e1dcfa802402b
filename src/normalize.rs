// src/normalize.rs

//! Raw field maps into canonical [`Listing`]s.

use crate::domain::locality::state_code;
use crate::domain::logic::{canonical_property_type, derive_auction_round, derive_discount};
use crate::domain::{parse_locality, Field, Listing, RawExtraction};
use crate::errors::ExtractionError;
use crate::extract::{clean_text, parse_area, parse_count, parse_percent, parse_price};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

/// City and state used when an address carries no state token.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeDefaults {
    pub default_city: String,
    pub default_state: String,
}

impl Default for NormalizeDefaults {
    fn default() -> Self {
        Self {
            default_city: "São Paulo".to_string(),
            default_state: "SP".to_string(),
        }
    }
}

/// Stable id for listings whose site exposes none: sha256 of url + price,
/// first 16 hex chars.
fn derived_id(url: &str, price: f64) -> String {
    let digest = Sha256::digest(format!("{url}|{price:.2}").as_bytes());
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

fn text(raw: &RawExtraction, field: Field) -> String {
    raw.get(field).map(clean_text).unwrap_or_default()
}

pub fn normalize(raw: &RawExtraction, source: &str, defaults: &NormalizeDefaults) -> Result<Listing, ExtractionError> {
    normalize_at(raw, source, defaults, Utc::now())
}

/// [`normalize`] with an explicit extraction timestamp.
pub fn normalize_at(
    raw: &RawExtraction,
    source: &str,
    defaults: &NormalizeDefaults,
    now: DateTime<Utc>,
) -> Result<Listing, ExtractionError> {
    let href = raw
        .get(Field::Url)
        .ok_or(ExtractionError::MissingField { field: "source_url" })?;
    let source_url = Url::parse(href)
        .map_err(|e| ExtractionError::InvalidUrl {
            url: href.to_string(),
            reason: e.to_string(),
        })?
        .to_string();

    let asking_price = raw.get(Field::Price).map(parse_price).unwrap_or(0.0);
    let appraised_value = raw.get(Field::AppraisedValue).map(parse_price).unwrap_or(0.0);

    let discount_percent = match raw.get(Field::Discount).map(parse_percent) {
        Some(explicit) if explicit > 0.0 => explicit.min(100.0),
        _ => derive_discount(asking_price, appraised_value),
    };
    let auction_round = derive_auction_round(raw.get(Field::Round), discount_percent);

    let address = text(raw, Field::Address);
    let locality = parse_locality(&address, &defaults.default_city, &defaults.default_state);
    let neighborhood = match raw.get(Field::Neighborhood) {
        Some(n) => clean_text(n),
        None => locality.neighborhood,
    };
    let city = match raw.get(Field::City) {
        Some(c) => clean_text(c),
        None => locality.city,
    };
    let state = raw
        .get(Field::State)
        .and_then(state_code)
        .map(str::to_string)
        .unwrap_or(locality.state);

    let property_type = [Field::PropertyType, Field::Title, Field::Description]
        .iter()
        .filter_map(|f| raw.get(*f))
        .map(canonical_property_type)
        .find(|kind| !kind.is_empty())
        .unwrap_or_default();

    let source_id = match raw.get(Field::Id) {
        Some(id) => format!("{source}:{}", clean_text(id)),
        None => format!("{source}:{}", derived_id(&source_url, asking_price)),
    };

    let mut images: Vec<String> = Vec::with_capacity(raw.images.len());
    for img in &raw.images {
        let img = img.trim();
        if !img.is_empty() && !images.iter().any(|seen| seen == img) {
            images.push(img.to_string());
        }
    }

    let incomplete = asking_price <= 0.0;
    if incomplete {
        debug!(source, url = %source_url, "asking price not extracted; listing marked incomplete");
    }

    Ok(Listing {
        source_id,
        source: source.to_string(),
        partner: raw.partner.clone(),
        address,
        neighborhood,
        city,
        state,
        property_type,
        private_area_m2: raw.get(Field::PrivateArea).map(parse_area).unwrap_or(0.0),
        total_area_m2: raw.get(Field::TotalArea).map(parse_area).unwrap_or(0.0),
        bedrooms: raw.get(Field::Bedrooms).map(parse_count).unwrap_or(0),
        parking_spots: raw.get(Field::Parking).map(parse_count).unwrap_or(0),
        asking_price,
        appraised_value,
        discount_percent,
        auction_round,
        sale_modality: text(raw, Field::Modality),
        auction_date: text(raw, Field::AuctionDate),
        description: text(raw, Field::Description),
        images,
        source_url,
        extraction_timestamp: now,
        incomplete,
        market: None,
    })
}

/// Normalizes a whole adapter batch. Records that cannot become listings are
/// dropped and counted.
pub fn normalize_batch(
    records: &[RawExtraction],
    source: &str,
    defaults: &NormalizeDefaults,
) -> (Vec<Listing>, usize) {
    let now = Utc::now();
    let mut listings = Vec::with_capacity(records.len());
    let mut rejected = 0;
    for raw in records {
        match normalize_at(raw, source, defaults, now) {
            Ok(listing) => listings.push(listing),
            Err(e) => {
                debug!(source, error = %e, "record discarded");
                rejected += 1;
            }
        }
    }
    (listings, rejected)
}
