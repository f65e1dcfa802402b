// src/domain/listing.rs

use crate::domain::market::MarketEstimate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical field names an adapter can extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Url,
    Title,
    Price,
    AppraisedValue,
    Address,
    Neighborhood,
    City,
    State,
    PrivateArea,
    TotalArea,
    Bedrooms,
    Parking,
    Discount,
    AuctionDate,
    Round,
    Modality,
    PropertyType,
    Description,
    Image,
}

/// Untyped field → text map for one listing as one adapter saw it.
/// Discarded once normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawExtraction {
    fields: BTreeMap<Field, String>,
    pub images: Vec<String>,
    pub partner: Option<String>,
}

impl RawExtraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a trimmed value; blank values are ignored.
    pub fn insert(&mut self, field: Field, value: impl AsRef<str>) {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.fields.insert(field, value.to_string());
        }
    }

    pub fn with(mut self, field: Field, value: impl AsRef<str>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    /// Layers a detail-page extraction over this listing-card record.
    /// Detail values win where present; the card keeps everything else.
    /// The longer image list wins.
    pub fn merge_from(&mut self, detail: RawExtraction) {
        for (field, value) in detail.fields {
            self.fields.insert(field, value);
        }
        if detail.images.len() > self.images.len() {
            self.images = detail.images;
        }
        if self.partner.is_none() {
            self.partner = detail.partner;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionRound {
    #[default]
    First,
    Second,
}


impl std::str::FromStr for AuctionRound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "1" | "primeira" => Ok(AuctionRound::First),
            "second" | "2" | "segunda" => Ok(AuctionRound::Second),
            other => Err(format!("unknown auction round `{other}`")),
        }
    }
}

/// One auctioned property in canonical form.
///
/// Created by the normalizer and immutable afterwards, except for `market`
/// which the aggregator fills in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub source_id: String,
    pub source: String,
    pub partner: Option<String>,

    pub address: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,

    pub property_type: String,
    pub private_area_m2: f64,
    pub total_area_m2: f64,
    pub bedrooms: u32,
    pub parking_spots: u32,

    pub asking_price: f64,
    pub appraised_value: f64,
    pub discount_percent: f64,
    pub auction_round: AuctionRound,
    pub sale_modality: String,
    pub auction_date: String,

    pub description: String,
    pub images: Vec<String>,
    pub source_url: String,
    pub extraction_timestamp: DateTime<Utc>,

    /// Asking price could not be extracted (it is 0.0).
    pub incomplete: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<MarketEstimate>,
}

impl Listing {
    /// Area used as the reference for market comparisons.
    pub fn reference_area(&self) -> f64 {
        if self.private_area_m2 > 0.0 {
            self.private_area_m2
        } else {
            self.total_area_m2
        }
    }
}
