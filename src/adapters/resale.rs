// src/adapters/resale.rs

//! Resale bank-owned property portal. One sub-listing per partner bank,
//! each paginated by page number.

use crate::adapters::engine::{self, CompiledSite, ListingPage};
use crate::adapters::{SearchQuery, SiteAdapter, SiteSessionConfig, SourceUrl};
use crate::domain::{Field, RawExtraction};
use crate::errors::{ExtractionError, ScrapeError};
use crate::extract::StrategySpec as S;
use crate::pagination::PaginationPlan;
use crate::session::Session;
use async_trait::async_trait;

pub const NAME: &str = "resale";

pub const PARTNERS: [&str; 3] = ["santander", "bradesco", "itau"];

const BASE_URL: &str = "https://www.resale.com.br/imoveis";

pub struct ResaleAdapter {
    config: SiteSessionConfig,
    site: CompiledSite,
}

impl ResaleAdapter {
    pub fn new(config: SiteSessionConfig) -> Result<Self, ExtractionError> {
        let site = CompiledSite::compile(&config)?;
        Ok(Self { config, site })
    }

    pub fn default_config() -> SiteSessionConfig {
        let mut config = SiteSessionConfig::default();
        for partner in PARTNERS {
            config = config.with_source(SourceUrl::partner(format!("{BASE_URL}/{partner}"), partner));
        }
        config
            .with_cards(&["div.property-card", "div.card-imovel", "li.resultado-item"])
            .with_field(
                Field::Url,
                vec![S::attr("a.property-card__link", "href"), S::attr("a[href*='/imovel/']", "href"), S::attr("a[href]", "href")],
            )
            .with_field(
                Field::Id,
                vec![
                    S::attr("[data-id]", "data-id"),
                    S::attr_pattern("a[href]", "href", r"/imovel/(?:[^/]+-)?(\d+)"),
                ],
            )
            .with_field(Field::Title, vec![S::text(".property-card__title"), S::text("h2"), S::text("h3")])
            .with_field(Field::Address, vec![S::text(".property-card__address"), S::text(".endereco")])
            .with_field(Field::Neighborhood, vec![S::text(".property-card__neighborhood")])
            .with_field(
                Field::Price,
                vec![
                    S::text(".property-card__price--current"),
                    S::text(".property-card__price"),
                    S::pattern(r"(?i)(?:por|venda):?\s*R\$\s*([\d.,]+)"),
                    S::pattern(r"R\$\s*([\d.,]+)"),
                ],
            )
            .with_field(
                Field::AppraisedValue,
                vec![S::text(".property-card__price--old"), S::pattern(r"(?i)de:?\s*R\$\s*([\d.,]+)")],
            )
            .with_field(Field::Discount, vec![S::text(".property-card__discount"), S::pattern(r"(\d+[.,]?\d*)\s*%\s*off")])
            .with_field(Field::PropertyType, vec![S::text(".property-card__type")])
            .with_field(Field::PrivateArea, vec![S::pattern(r"(?i)([\d.,]+)\s*m²")])
            .with_field(Field::Bedrooms, vec![S::pattern(r"(?i)(\d+)\s*(?:quartos?|dorms?)")])
            .with_field(Field::Image, vec![S::attr("img[data-src]", "data-src"), S::attr("img", "src")])
            .with_detail_field(Field::Description, vec![S::text(".property-description"), S::text("#descricao")])
            .with_detail_field(Field::TotalArea, vec![S::pattern(r"(?i)[áa]rea (?:total|terreno):?\s*([\d.,]+)\s*m")])
            .with_detail_field(
                Field::PrivateArea,
                vec![S::pattern(r"(?i)[áa]rea (?:privativa|útil|util|construída|construida):?\s*([\d.,]+)\s*m")],
            )
            .with_detail_field(Field::Parking, vec![S::pattern(r"(?i)(\d+)\s*vagas?")])
            .with_detail_field(
                Field::Modality,
                vec![S::text(".property-modality"), S::pattern(r"(?i)(venda direta|leil[ãa]o|proposta)")],
            )
            .with_detail_field(Field::AuctionDate, vec![S::pattern(r"(?i)data:?\s*(\d{2}/\d{2}/\d{4})")])
            .with_detail_field(Field::Image, vec![S::attr(".gallery img", "src"), S::attr(".swiper img", "src")])
            .with_pagination(PaginationPlan::default().with_page_param("pagina"))
    }

    fn search_urls(&self, query: &SearchQuery) -> Vec<SourceUrl> {
        self.config
            .sources
            .iter()
            .map(|source| {
                let mut pairs = Vec::new();
                if let Some(uf) = &query.state {
                    pairs.push(("estado", uf.to_uppercase()));
                }
                if let Some(max) = query.max_price {
                    pairs.push(("valor_max", format!("{}", max.round() as u64)));
                }
                SourceUrl {
                    url: engine::with_query(&source.url, &pairs),
                    partner: source.partner.clone(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl SiteAdapter for ResaleAdapter {
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
        engine::collect_listing_pages(session, &self.site, &self.config, &sources).await
    }

    async fn collect_detail(&self, session: &mut Session, url: &str) -> Result<RawExtraction, ScrapeError> {
        engine::collect_detail_page(session, &self.site, &self.config, url).await
    }
}
