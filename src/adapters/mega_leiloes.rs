// src/adapters/mega_leiloes.rs

//! Mega Leilões. State and property type are path segments of the search
//! URL; pagination follows the "next" link.

use crate::adapters::engine::{self, CompiledSite, ListingPage};
use crate::adapters::{SearchQuery, SiteAdapter, SiteSessionConfig, SourceUrl};
use crate::domain::logic::canonical_property_type;
use crate::domain::{Field, RawExtraction};
use crate::errors::{ExtractionError, ScrapeError};
use crate::extract::StrategySpec as S;
use crate::pagination::PaginationPlan;
use crate::session::Session;
use async_trait::async_trait;

pub const NAME: &str = "mega_leiloes";

const SEARCH_URL: &str = "https://www.megaleiloes.com.br/imoveis";

pub struct MegaLeiloesAdapter {
    config: SiteSessionConfig,
    site: CompiledSite,
}

/// Path segment Mega Leilões uses for a canonical property type.
fn type_segment(kind: &str) -> Option<&'static str> {
    match canonical_property_type(kind).as_str() {
        "apartamento" => Some("apartamentos"),
        "casa" | "sobrado" => Some("casas"),
        "terreno" => Some("terrenos-e-lotes"),
        "comercial" | "galpao" => Some("imoveis-comerciais"),
        "rural" => Some("imoveis-rurais"),
        _ => None,
    }
}

impl MegaLeiloesAdapter {
    pub fn new(config: SiteSessionConfig) -> Result<Self, ExtractionError> {
        let site = CompiledSite::compile(&config)?;
        Ok(Self { config, site })
    }

    pub fn default_config() -> SiteSessionConfig {
        SiteSessionConfig::default()
            .with_source(SourceUrl::new(SEARCH_URL))
            .with_cards(&["div.card", "div.leilao-card", "div[class*='card-auction']"])
            .with_field(
                Field::Url,
                vec![S::attr("a.card-title", "href"), S::attr("a.card-image", "href"), S::attr("a[href]", "href")],
            )
            .with_field(
                Field::Id,
                vec![
                    S::text(".card-number"),
                    S::attr_pattern("a[href]", "href", r"-(j\d+|x\d+)(?:[/?#]|$)"),
                ],
            )
            .with_field(Field::Title, vec![S::text("a.card-title"), S::text(".card-title")])
            .with_field(Field::Address, vec![S::text(".card-locality"), S::text(".card-local")])
            .with_field(
                Field::Price,
                vec![
                    S::text(".card-instance-info.active .card-instance-value"),
                    S::text(".card-instance-value"),
                    S::pattern(r"R\$\s*([\d.,]+)"),
                ],
            )
            .with_field(
                Field::Round,
                vec![S::text(".card-instance-info.active .card-instance-title"), S::text(".card-instance-title")],
            )
            .with_field(
                Field::AuctionDate,
                vec![S::text(".card-instance-info.active .card-first-instance-date"), S::pattern(r"(\d{2}/\d{2}/\d{4}(?:\s*\d{2}:\d{2})?)")],
            )
            .with_field(Field::PropertyType, vec![S::text(".card-type")])
            .with_field(Field::Image, vec![S::attr(".card-image", "data-bg"), S::attr("img", "src")])
            .with_detail_field(Field::Description, vec![S::text("#tab-description"), S::text(".description")])
            .with_detail_field(
                Field::AppraisedValue,
                vec![S::pattern(r"(?i)(?:valor de )?avalia[çc][ãa]o:?\s*R\$\s*([\d.,]+)")],
            )
            .with_detail_field(
                Field::PrivateArea,
                vec![S::pattern(r"(?i)[áa]rea (?:privativa|útil|util|construída|construida):?\s*([\d.,]+)\s*m")],
            )
            .with_detail_field(Field::TotalArea, vec![S::pattern(r"(?i)[áa]rea total:?\s*([\d.,]+)\s*m")])
            .with_detail_field(Field::Bedrooms, vec![S::pattern(r"(?i)(\d+)\s*(?:quartos?|dormit[óo]rios?|dorms?\.?)")])
            .with_detail_field(Field::Parking, vec![S::pattern(r"(?i)(\d+)\s*vagas?")])
            .with_detail_field(
                Field::Modality,
                vec![S::text(".batch-type"), S::pattern(r"(?i)(leil[ãa]o judicial|leil[ãa]o extrajudicial|venda direta)")],
            )
            .with_detail_field(Field::Image, vec![S::attr(".carousel-item img", "src"), S::attr(".gallery img", "src")])
            .with_pagination(PaginationPlan::default().with_next("ul.pagination li.next a"))
    }

    fn search_urls(&self, query: &SearchQuery) -> Vec<SourceUrl> {
        let segment = query.property_type.as_deref().and_then(type_segment);
        self.config
            .sources
            .iter()
            .map(|source| {
                let mut url = source.url.trim_end_matches('/').to_string();
                match (segment, &query.state) {
                    (Some(kind), Some(uf)) => url = format!("{url}/{kind}/{}", uf.to_lowercase()),
                    (Some(kind), None) => url = format!("{url}/{kind}"),
                    (None, Some(uf)) => url = format!("{url}/{}", uf.to_lowercase()),
                    (None, None) => {}
                }
                SourceUrl {
                    url,
                    partner: source.partner.clone(),
                }
            })
            .collect()
    }
}

fn refine(raw: &mut RawExtraction) {
    if !raw.contains(Field::PropertyType) {
        let kind = raw.get(Field::Title).map(canonical_property_type);
        if let Some(kind) = kind.filter(|k| !k.is_empty()) {
            raw.insert(Field::PropertyType, kind);
        }
    }
}

#[async_trait]
impl SiteAdapter for MegaLeiloesAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn config(&self) -> &SiteSessionConfig {
        &self.config
    }

    async fn collect_listing_page(
        &self,
        session: &mut Session,
        query: &SearchQuery,
    ) -> Result<ListingPage, ScrapeError> {
        let sources = self.search_urls(query);
        let mut page = engine::collect_listing_pages(session, &self.site, &self.config, &sources).await?;
        page.records.iter_mut().for_each(refine);
        Ok(page)
    }

    async fn collect_detail(&self, session: &mut Session, url: &str) -> Result<RawExtraction, ScrapeError> {
        engine::collect_detail_page(session, &self.site, &self.config, url).await
    }
}
