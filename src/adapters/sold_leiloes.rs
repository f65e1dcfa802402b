// src/adapters/sold_leiloes.rs

//! Sold Leilões. Hosts auctions for several banks; each partner's catalogue
//! is walked in turn by clicking "next".

use crate::adapters::engine::{self, CompiledSite, ListingPage};
use crate::adapters::{SearchQuery, SiteAdapter, SiteSessionConfig, SourceUrl};
use crate::domain::{Field, RawExtraction};
use crate::errors::{ExtractionError, ScrapeError};
use crate::extract::StrategySpec as S;
use crate::pagination::PaginationPlan;
use crate::session::Session;
use async_trait::async_trait;

pub const NAME: &str = "sold_leiloes";

pub const PARTNERS: [&str; 3] = ["bb", "banrisul", "inter"];

const BASE_URL: &str = "https://www.sold.com.br/leiloes/imoveis";

pub struct SoldLeiloesAdapter {
    config: SiteSessionConfig,
    site: CompiledSite,
}

impl SoldLeiloesAdapter {
    pub fn new(config: SiteSessionConfig) -> Result<Self, ExtractionError> {
        let site = CompiledSite::compile(&config)?;
        Ok(Self { config, site })
    }

    pub fn default_config() -> SiteSessionConfig {
        let mut config = SiteSessionConfig::default();
        for partner in PARTNERS {
            let url = format!("{BASE_URL}?comitente={partner}");
            config = config.with_source(SourceUrl::partner(url, partner));
        }
        config
            .with_cards(&["div.lote-card", "div.card-lote", "article.lote"])
            .with_field(
                Field::Url,
                vec![S::attr("a.lote-card__link", "href"), S::attr("a[href*='/lote/']", "href"), S::attr("a[href]", "href")],
            )
            .with_field(
                Field::Id,
                vec![S::attr("[data-lote-id]", "data-lote-id"), S::attr_pattern("a[href]", "href", r"/lote/(\d+)")],
            )
            .with_field(Field::Title, vec![S::text(".lote-card__title"), S::text("h3"), S::text("h2")])
            .with_field(Field::Address, vec![S::text(".lote-card__location"), S::text(".localizacao")])
            .with_field(
                Field::Price,
                vec![
                    S::text(".lote-card__lance-atual"),
                    S::pattern(r"(?i)lance (?:inicial|m[ií]nimo|atual):?\s*R\$\s*([\d.,]+)"),
                    S::pattern(r"R\$\s*([\d.,]+)"),
                ],
            )
            .with_field(
                Field::AppraisedValue,
                vec![S::pattern(r"(?i)avalia[çc][ãa]o:?\s*R\$\s*([\d.,]+)")],
            )
            .with_field(Field::Round, vec![S::text(".lote-card__praca"), S::pattern(r"(?i)([12])[ªa]\s*pra[çc]a")])
            .with_field(Field::AuctionDate, vec![S::text(".lote-card__data"), S::pattern(r"(\d{2}/\d{2}/\d{4})")])
            .with_field(Field::Image, vec![S::attr("img[data-src]", "data-src"), S::attr("img", "src")])
            .with_detail_field(Field::Description, vec![S::text(".lote-descricao"), S::text("#descricao")])
            .with_detail_field(
                Field::PrivateArea,
                vec![S::pattern(r"(?i)[áa]rea (?:privativa|útil|util|construída|construida):?\s*([\d.,]+)\s*m")],
            )
            .with_detail_field(Field::TotalArea, vec![S::pattern(r"(?i)[áa]rea (?:total|do terreno):?\s*([\d.,]+)\s*m")])
            .with_detail_field(Field::Bedrooms, vec![S::pattern(r"(?i)(\d+)\s*(?:quartos?|dormit[óo]rios?)")])
            .with_detail_field(Field::Parking, vec![S::pattern(r"(?i)(\d+)\s*vagas?")])
            .with_detail_field(Field::PropertyType, vec![S::text(".lote-categoria")])
            .with_detail_field(
                Field::Modality,
                vec![S::pattern(r"(?i)(leil[ãa]o (?:judicial|extrajudicial)|venda direta|alien[çc][ãa]o fiduci[áa]ria)")],
            )
            .with_detail_field(Field::Image, vec![S::attr(".lote-galeria img", "src"), S::attr(".carousel img", "src")])
            .with_pagination(PaginationPlan::default().with_next("a[rel='next'], li.pagination-next a"))
    }

    fn search_urls(&self, query: &SearchQuery) -> Vec<SourceUrl> {
        match &query.state {
            Some(uf) => self
                .config
                .sources
                .iter()
                .map(|source| SourceUrl {
                    url: engine::with_query(&source.url, &[("uf", uf.to_uppercase())]),
                    partner: source.partner.clone(),
                })
                .collect(),
            None => self.config.sources.clone(),
        }
    }
}

#[async_trait]
impl SiteAdapter for SoldLeiloesAdapter {
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
