// src/adapters/zuk.rs

//! Portal Zuk. Cards load lazily while scrolling; further batches come from a
//! "load more" button on the same page.

use crate::adapters::engine::{self, CompiledSite, ListingPage};
use crate::adapters::{SearchQuery, SiteAdapter, SiteSessionConfig, SourceUrl};
use crate::domain::{Field, RawExtraction};
use crate::errors::{ExtractionError, ScrapeError};
use crate::extract::StrategySpec as S;
use crate::pagination::PaginationPlan;
use crate::session::Session;
use async_trait::async_trait;

pub const NAME: &str = "zuk";

const SEARCH_URL: &str = "https://www.portalzuk.com.br/leilao-de-imoveis";

pub struct ZukAdapter {
    config: SiteSessionConfig,
    site: CompiledSite,
}

impl ZukAdapter {
    pub fn new(config: SiteSessionConfig) -> Result<Self, ExtractionError> {
        let site = CompiledSite::compile(&config)?;
        Ok(Self { config, site })
    }

    pub fn default_config() -> SiteSessionConfig {
        SiteSessionConfig::default()
            .with_source(SourceUrl::new(SEARCH_URL))
            .with_cards(&["div.card-property", "article.card", "div[data-lote]"])
            .with_field(
                Field::Url,
                vec![
                    S::attr("a.card-property-image-wrapper", "href"),
                    S::attr("a[href*='/imovel/']", "href"),
                    S::attr("a[href]", "href"),
                ],
            )
            .with_field(
                Field::Id,
                vec![
                    S::attr("[data-lote]", "data-lote"),
                    S::attr_pattern("a[href]", "href", r"/(\d{4,})(?:[/?#]|$)"),
                ],
            )
            .with_field(Field::Title, vec![S::text(".card-property-name"), S::text("h2"), S::text("h3")])
            .with_field(
                Field::Address,
                vec![S::text(".card-property-address"), S::text("address")],
            )
            .with_field(
                Field::Price,
                vec![
                    S::text(".card-property-price-value"),
                    S::pattern(r"(?i)lance m[ií]nimo:?\s*R\$\s*([\d.,]+)"),
                    S::pattern(r"R\$\s*([\d.,]+)"),
                ],
            )
            .with_field(
                Field::AppraisedValue,
                vec![S::pattern(r"(?i)avalia[çc][ãa]o:?\s*R\$\s*([\d.,]+)")],
            )
            .with_field(Field::Discount, vec![S::text(".card-property-discount"), S::pattern(r"(\d+[.,]?\d*)\s*%\s*(?:de\s*)?desconto")])
            .with_field(Field::Round, vec![S::text(".card-property-price-label"), S::pattern(r"(?i)([12])[ºo°ª]\s*leil[ãa]o")])
            .with_field(Field::AuctionDate, vec![S::pattern(r"(\d{2}/\d{2}/\d{4}(?:\s*(?:às|-)?\s*\d{2}[h:]\d{2})?)")])
            .with_field(Field::PrivateArea, vec![S::pattern(r"(?i)([\d.,]+)\s*m²\s*(?:priv|útil|util)")])
            .with_field(Field::Image, vec![S::attr("img[data-src]", "data-src"), S::attr("img", "src")])
            .with_detail_field(Field::Description, vec![S::text(".property-description"), S::text("#descricao")])
            .with_detail_field(
                Field::PrivateArea,
                vec![S::pattern(r"(?i)[áa]rea (?:privativa|útil|util):?\s*([\d.,]+)\s*m")],
            )
            .with_detail_field(Field::TotalArea, vec![S::pattern(r"(?i)[áa]rea total:?\s*([\d.,]+)\s*m")])
            .with_detail_field(Field::Bedrooms, vec![S::pattern(r"(?i)(\d+)\s*(?:quartos?|dormit[óo]rios?)")])
            .with_detail_field(Field::Parking, vec![S::pattern(r"(?i)(\d+)\s*vagas?")])
            .with_detail_field(Field::Modality, vec![S::text(".property-modality"), S::pattern(r"(?i)(leil[ãa]o (?:judicial|extrajudicial)|venda direta)")])
            .with_detail_field(Field::PropertyType, vec![S::text(".property-type")])
            .with_detail_field(Field::Image, vec![S::attr(".property-gallery img", "src"), S::attr(".swiper-slide img", "src")])
            .with_pagination(
                PaginationPlan::default()
                    .with_scrolls(3)
                    .with_next("button#btn_carregar_mais, a.load-more"),
            )
    }

    fn search_urls(&self, query: &SearchQuery) -> Vec<SourceUrl> {
        // Zuk filters by path segment: /leilao-de-imoveis/u/todos-imoveis/sp
        self.config
            .sources
            .iter()
            .map(|source| match &query.state {
                Some(uf) => SourceUrl {
                    url: format!(
                        "{}/u/todos-imoveis/{}",
                        source.url.trim_end_matches('/'),
                        uf.to_lowercase()
                    ),
                    partner: source.partner.clone(),
                },
                None => source.clone(),
            })
            .collect()
    }
}

fn refine(raw: &mut RawExtraction) {
    // Card addresses come as "Rua X, 10 | Bairro | Cidade/UF".
    if let Some(address) = raw.get(Field::Address) {
        if address.contains('|') {
            let fixed = address
                .split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" - ");
            raw.insert(Field::Address, fixed);
        }
    }
}

#[async_trait]
impl SiteAdapter for ZukAdapter {
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
