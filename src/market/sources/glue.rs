// src/market/sources/glue.rs

//! ZAP Imóveis and VivaReal share one listings-search JSON API; the portal
//! is chosen by the `x-domain` header.

use crate::domain::logic::canonical_property_type;
use crate::domain::MarketSample;
use crate::errors::MarketError;
use crate::market::{EstimateRequest, MarketSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const GLUE_API: &str = "https://glue-api.zapimoveis.com.br/v2/listings";
const PAGE_SIZE: &str = "36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Portal {
    Zap,
    VivaReal,
}

impl Portal {
    pub fn name(&self) -> &'static str {
        match self {
            Portal::Zap => "zap",
            Portal::VivaReal => "vivareal",
        }
    }

    fn domain(&self) -> &'static str {
        match self {
            Portal::Zap => "www.zapimoveis.com.br",
            Portal::VivaReal => "www.vivareal.com.br",
        }
    }

    fn origin(&self) -> String {
        format!("https://{}", self.domain())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    search: Option<Search>,
}

#[derive(Debug, Deserialize)]
struct Search {
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    listings: Vec<Envelope>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    listing: GlueListing,
    link: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlueListing {
    #[serde(default)]
    usable_areas: Vec<f64>,
    #[serde(default)]
    total_areas: Vec<f64>,
    #[serde(default)]
    bedrooms: Vec<u32>,
    #[serde(default)]
    unit_types: Vec<String>,
    #[serde(default)]
    pricing_infos: Vec<PricingInfo>,
    address: Option<GlueAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricingInfo {
    /// Sent as a string by some API versions and as a number by others.
    price: Option<serde_json::Value>,
    business_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GlueAddress {
    city: Option<String>,
    neighborhood: Option<String>,
    street: Option<String>,
}

fn unit_type(property_type: &str) -> Option<&'static str> {
    match canonical_property_type(property_type).as_str() {
        "apartamento" => Some("APARTMENT"),
        "casa" => Some("HOME"),
        "sobrado" => Some("TWO_STORY_HOUSE"),
        "terreno" => Some("RESIDENTIAL_ALLOTMENT_LAND"),
        "comercial" => Some("COMMERCIAL_PROPERTY"),
        "galpao" => Some("SHED_DEPOSIT_WAREHOUSE"),
        "rural" => Some("FARM"),
        _ => None,
    }
}

fn sample_from(portal: Portal, envelope: Envelope) -> Option<MarketSample> {
    let listing = envelope.listing;
    let price = listing
        .pricing_infos
        .iter()
        .filter(|p| p.business_type.as_deref().unwrap_or("SALE") == "SALE")
        .find_map(|p| match p.price.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        })?;
    let area = listing
        .usable_areas
        .first()
        .or_else(|| listing.total_areas.first())
        .copied()
        .unwrap_or(0.0);

    let mut sample = MarketSample::new(portal.name(), price, area);
    sample.bedrooms = listing.bedrooms.first().copied();
    sample.property_type = listing.unit_types.first().cloned().unwrap_or_default();
    if let Some(address) = listing.address {
        sample.city = address.city.unwrap_or_default();
        sample.neighborhood = address.neighborhood.unwrap_or_default();
        sample.address = address.street.unwrap_or_default();
    }
    if let Some(href) = envelope.link.and_then(|l| l.href) {
        sample.url = format!("{}{}", portal.origin(), href);
    }
    Some(sample)
}

/// Parses a search payload into samples. Listings without a sale price are
/// skipped.
pub fn parse_response(portal: Portal, body: &str) -> Result<Vec<MarketSample>, MarketError> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|e| MarketError::Decode {
        site: portal.name().to_string(),
        reason: e.to_string(),
    })?;
    let listings = response
        .search
        .and_then(|s| s.result)
        .map(|r| r.listings)
        .unwrap_or_default();
    Ok(listings.into_iter().filter_map(|e| sample_from(portal, e)).collect())
}

pub struct GlueSource {
    client: Client,
    portal: Portal,
}

impl GlueSource {
    pub fn new(client: Client, portal: Portal) -> Self {
        Self { client, portal }
    }

    fn params(&self, request: &EstimateRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("business", "SALE".to_string()),
            ("listingType", "USED".to_string()),
            ("addressCity", request.city.clone()),
            ("addressState", request.state.clone()),
            ("size", PAGE_SIZE.to_string()),
        ];
        if !request.neighborhood.is_empty() {
            params.push(("addressNeighborhood", request.neighborhood.clone()));
        }
        if let Some(kind) = unit_type(&request.property_type) {
            params.push(("unitTypes", kind.to_string()));
        }
        if request.bedrooms > 0 {
            params.push(("bedrooms", request.bedrooms.to_string()));
        }
        params
    }
}

#[async_trait]
impl MarketSource for GlueSource {
    fn name(&self) -> &str {
        self.portal.name()
    }

    async fn query(&self, request: &EstimateRequest) -> Result<Vec<MarketSample>, MarketError> {
        let failed = |reason: String| MarketError::QueryFailed {
            site: self.portal.name().to_string(),
            reason,
        };

        let resp = self
            .client
            .get(GLUE_API)
            .header("x-domain", self.portal.domain())
            .header(reqwest::header::ORIGIN, self.portal.origin())
            .query(&self.params(request))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| failed(e.to_string()))?;
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }
        parse_response(self.portal, &body)
    }
}
