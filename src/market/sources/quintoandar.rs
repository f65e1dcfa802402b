// src/market/sources/quintoandar.rs

//! QuintoAndar search pages embed their results in the `__NEXT_DATA__`
//! script; no stable JSON API is exposed.

use crate::domain::logic::normalize_text;
use crate::domain::MarketSample;
use crate::errors::MarketError;
use crate::market::{EstimateRequest, MarketSource};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;

pub const NAME: &str = "quintoandar";

const BASE_URL: &str = "https://www.quintoandar.com.br/comprar/imovel";

fn decode_err(reason: impl Into<String>) -> MarketError {
    MarketError::Decode {
        site: NAME.to_string(),
        reason: reason.into(),
    }
}

fn slug(text: &str) -> String {
    normalize_text(text)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// `/comprar/imovel/vila-mariana-sao-paulo-sp-brasil`
pub fn search_url(request: &EstimateRequest) -> String {
    let mut parts = Vec::new();
    if !request.neighborhood.is_empty() {
        parts.push(slug(&request.neighborhood));
    }
    parts.push(slug(&request.city));
    parts.push(slug(&request.state));
    parts.push("brasil".to_string());
    format!("{BASE_URL}/{}", parts.join("-"))
}

pub fn extract_next_data(html: &str) -> Result<Value, MarketError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"script[id="__NEXT_DATA__"]"#).map_err(|e| decode_err(format!("{e:?}")))?;
    let element = document
        .select(&selector)
        .next()
        .ok_or_else(|| decode_err("__NEXT_DATA__ missing"))?;
    let json_text: String = element.text().collect();
    serde_json::from_str(&json_text).map_err(|e| decode_err(e.to_string()))
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Any object carrying a sale price is taken as a house; the state tree's
/// layout has moved between releases, so it is searched rather than indexed.
fn collect_houses(value: &Value, out: &mut Vec<MarketSample>) {
    match value {
        Value::Object(map) => {
            if let Some(price) = number(map.get("salePrice")).filter(|p| *p > 0.0) {
                let area = number(map.get("area")).unwrap_or(0.0);
                let mut sample = MarketSample::new(NAME, price, area);
                sample.bedrooms = number(map.get("bedrooms")).map(|b| b as u32);
                sample.neighborhood = string(map.get("neighbourhood").or_else(|| map.get("neighborhood")));
                sample.city = string(map.get("city"));
                sample.address = string(map.get("address"));
                sample.property_type = string(map.get("type"));
                if let Some(id) = map.get("id").and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_u64().map(|n| n.to_string()))) {
                    sample.url = format!("https://www.quintoandar.com.br/imovel/{id}");
                }
                out.push(sample);
                return;
            }
            for child in map.values() {
                collect_houses(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_houses(item, out);
            }
        }
        _ => {}
    }
}

pub fn parse_page(html: &str) -> Result<Vec<MarketSample>, MarketError> {
    let data = extract_next_data(html)?;
    let mut samples = Vec::new();
    collect_houses(&data["props"]["pageProps"], &mut samples);
    Ok(samples)
}

pub struct QuintoAndarSource {
    client: Client,
}

impl QuintoAndarSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarketSource for QuintoAndarSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn query(&self, request: &EstimateRequest) -> Result<Vec<MarketSample>, MarketError> {
        let failed = |reason: String| MarketError::QueryFailed {
            site: NAME.to_string(),
            reason,
        };
        let url = search_url(request);
        let resp = self.client.get(&url).send().await.map_err(|e| failed(e.to_string()))?;
        let status = resp.status();
        let html = resp.text().await.map_err(|e| failed(e.to_string()))?;
        if !status.is_success() {
            return Err(failed(format!("HTTP {status} for {url}")));
        }
        parse_page(&html)
    }
}
