// src/adapters/engine.rs

//! Selector-driven extraction shared by every site adapter.
//!
//! Parsing is synchronous and never crosses an await: the browser hands back
//! markup as a `String`, this module turns it into [`RawExtraction`]s.

use crate::adapters::challenge;
use crate::adapters::config::{SiteSessionConfig, SourceUrl};
use crate::domain::{Field, RawExtraction};
use crate::errors::{ExtractionError, ScrapeError};
use crate::extract::{CardLocator, FallbackChain};
use crate::pagination;
use crate::session::Session;
use scraper::Html;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// One site's selector configuration, compiled once per adapter.
#[derive(Debug, Clone)]
pub struct CompiledSite {
    cards: CardLocator,
    listing: Vec<(Field, FallbackChain)>,
    detail: Vec<(Field, FallbackChain)>,
}

fn compile_fields(
    fields: &std::collections::BTreeMap<Field, Vec<crate::extract::StrategySpec>>,
) -> Result<Vec<(Field, FallbackChain)>, ExtractionError> {
    fields
        .iter()
        .map(|(field, specs)| Ok((*field, FallbackChain::compile(specs)?)))
        .collect()
}

fn absolutize(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|b| b.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}

fn apply_chains(
    chains: &[(Field, FallbackChain)],
    scope: scraper::ElementRef<'_>,
    base: Option<&Url>,
    raw: &mut RawExtraction,
) {
    for (field, chain) in chains {
        match field {
            Field::Image => {
                for src in chain.resolve_all(scope) {
                    let src = absolutize(base, &src);
                    if !raw.images.contains(&src) {
                        raw.images.push(src);
                    }
                }
            }
            Field::Url => {
                if let Some(href) = chain.resolve(scope) {
                    raw.insert(Field::Url, absolutize(base, &href));
                }
            }
            _ => {
                if let Some(value) = chain.resolve(scope) {
                    raw.insert(*field, value);
                }
            }
        }
    }
}

impl CompiledSite {
    pub fn compile(config: &SiteSessionConfig) -> Result<Self, ExtractionError> {
        Ok(Self {
            cards: CardLocator::compile(&config.card_selectors)?,
            listing: compile_fields(&config.listing_fields)?,
            detail: compile_fields(&config.detail_fields)?,
        })
    }

    /// Every card on a listing page. A card yielding neither a link nor a
    /// price is reported as malformed and does not stop the others.
    pub fn extract_cards(
        &self,
        html: &str,
        page_url: &str,
        partner: Option<&str>,
    ) -> Vec<Result<RawExtraction, ExtractionError>> {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();

        self.cards
            .locate(&document)
            .into_iter()
            .enumerate()
            .map(|(index, card)| {
                let mut raw = RawExtraction::new();
                apply_chains(&self.listing, card, base.as_ref(), &mut raw);
                if !raw.contains(Field::Url) && !raw.contains(Field::Price) {
                    return Err(ExtractionError::MalformedCard {
                        index,
                        reason: "no link and no price".to_string(),
                    });
                }
                raw.partner = partner.map(str::to_string);
                Ok(raw)
            })
            .collect()
    }

    /// Detail-page fields. Missing fields are simply absent.
    pub fn extract_detail(&self, html: &str, page_url: &str) -> RawExtraction {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();
        let mut raw = RawExtraction::new();
        apply_chains(&self.detail, document.root_element(), base.as_ref(), &mut raw);
        raw
    }
}

/// A listing-pass result. `blocked` carries the challenge message when a
/// source stopped answering; records gathered before it are kept.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub records: Vec<RawExtraction>,
    pub extraction_errors: usize,
    pub pages_visited: usize,
    pub blocked: Option<String>,
}

fn card_key(raw: &RawExtraction) -> String {
    match raw.get(Field::Url) {
        Some(url) => url.to_string(),
        None => format!(
            "{}|{}|{}",
            raw.get(Field::Title).unwrap_or_default(),
            raw.get(Field::Address).unwrap_or_default(),
            raw.get(Field::Price).unwrap_or_default()
        ),
    }
}

/// Appends `pairs` to `base`'s query string. Values are percent-encoded.
pub fn with_query(base: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return base.to_string();
    }
    match Url::parse(base) {
        Ok(mut url) => {
            {
                let mut query = url.query_pairs_mut();
                for (k, v) in pairs {
                    query.append_pair(k, v);
                }
            }
            url.to_string()
        }
        Err(_) => base.to_string(),
    }
}

/// Walks each source in order, paginating through it and collecting cards.
///
/// Partners are visited sequentially with a longer pause between them. A
/// failed partner is logged and skipped; a blocked one ends the pass.
pub async fn collect_listing_pages(
    session: &mut Session,
    site: &CompiledSite,
    config: &SiteSessionConfig,
    sources: &[SourceUrl],
) -> Result<ListingPage, ScrapeError> {
    if sources.is_empty() {
        return Err(ScrapeError::Config(format!("{} has no listing sources", session.site())));
    }
    let mut out = ListingPage::default();
    let mut seen: HashSet<String> = HashSet::new();
    let limiter = session.limiter();
    let site_name = session.site().to_string();

    for (i, source) in sources.iter().enumerate() {
        if i > 0 {
            limiter.pause_scaled(3).await;
        }
        let partner = source.partner.as_deref();
        let before = out.records.len();

        let records = &mut out.records;
        let errors = &mut out.extraction_errors;
        let result = pagination::paginate(
            session,
            &source.url,
            &config.pagination,
            Some(&config.challenge),
            |page, html| {
                let mut fresh = 0;
                for card in site.extract_cards(html, &source.url, partner) {
                    match card {
                        Ok(raw) => {
                            if seen.insert(card_key(&raw)) {
                                records.push(raw);
                                fresh += 1;
                            }
                        }
                        Err(e) => {
                            debug!(site = %site_name, page, error = %e, "card skipped");
                            *errors += 1;
                        }
                    }
                }
                fresh
            },
        )
        .await;

        match result {
            Ok(outcome) => {
                out.pages_visited += outcome.pages_visited;
                info!(
                    site = %site_name,
                    partner = partner.unwrap_or("-"),
                    pages = outcome.pages_visited,
                    records = out.records.len() - before,
                    stop = ?outcome.stop,
                    "listing source done"
                );
            }
            Err(e @ ScrapeError::SourceBlocked { .. }) => {
                warn!(site = %site_name, partner = partner.unwrap_or("-"), error = %e, "source blocked");
                out.blocked = Some(e.to_string());
                break;
            }
            Err(e) => {
                warn!(site = %site_name, partner = partner.unwrap_or("-"), error = %e, "listing source failed");
                out.extraction_errors += 1;
            }
        }
    }

    Ok(out)
}

pub async fn collect_detail_page(
    session: &mut Session,
    site: &CompiledSite,
    config: &SiteSessionConfig,
    url: &str,
) -> Result<RawExtraction, ScrapeError> {
    session.goto(url).await?;
    challenge::wait_until_clear(session, &config.challenge).await?;
    let html = session.html().await?;
    Ok(site.extract_detail(&html, url))
}
