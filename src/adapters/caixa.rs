// src/adapters/caixa.rs

//! Caixa Econômica Federal property sales. One listing source, filtered by
//! state in the query string and paginated by page number.

use crate::adapters::engine::{self, CompiledSite, ListingPage};
use crate::adapters::{SearchQuery, SiteAdapter, SiteSessionConfig, SourceUrl};
use crate::domain::{Field, RawExtraction};
use crate::errors::{ExtractionError, ScrapeError};
use crate::extract::StrategySpec as S;
use crate::pagination::PaginationPlan;
use crate::session::Session;
use async_trait::async_trait;

pub const NAME: &str = "caixa";

const SEARCH_URL: &str = "https://venda-imoveis.caixa.gov.br/sistema/busca-imovel.asp?sltTipoBusca=imoveis";

pub struct CaixaAdapter {
    config: SiteSessionConfig,
    site: CompiledSite,
}

impl CaixaAdapter {
    pub fn new(config: SiteSessionConfig) -> Result<Self, ExtractionError> {
        let site = CompiledSite::compile(&config)?;
        Ok(Self { config, site })
    }

    pub fn default_config() -> SiteSessionConfig {
        SiteSessionConfig::default()
            .with_source(SourceUrl::new(SEARCH_URL))
            .with_cards(&["ul.lista-imoveis > li", "div.group-block-item", "li.imovel"])
            .with_field(
                Field::Url,
                vec![
                    S::attr("a[href*='detalhe-imovel']", "href"),
                    S::attr("a[onclick*='detalhe']", "data-href"),
                    S::attr("a[href]", "href"),
                ],
            )
            .with_field(
                Field::Id,
                vec![
                    S::attr_pattern("a[href]", "href", r"hdnimovel=(\d+)"),
                    S::pattern(r"N[ºo°]\s*do im[óo]vel:?\s*([\d-]+)"),
                ],
            )
            .with_field(Field::Title, vec![S::text("span strong"), S::text("h3"), S::text("a")])
            .with_field(
                Field::Price,
                vec![
                    S::pattern(r"(?i)valor m[ií]nimo de venda:?\s*R\$\s*([\d.,]+)"),
                    S::text(".valor-venda"),
                    S::pattern(r"R\$\s*([\d.,]+)"),
                ],
            )
            .with_field(
                Field::AppraisedValue,
                vec![S::pattern(r"(?i)valor de avalia[çc][ãa]o:?\s*R\$\s*([\d.,]+)")],
            )
            .with_field(Field::Discount, vec![S::pattern(r"(?i)desconto de\s*([\d.,]+)\s*%")])
            .with_field(
                Field::Address,
                vec![S::text(".endereco"), S::pattern(r"(?i)endere[çc]o:?\s*(.+?)(?:\s+Valor|$)")],
            )
            .with_field(
                Field::Modality,
                vec![S::pattern(
                    r"(?i)(venda direta online|venda online|licita[çc][ãa]o aberta|[12][ºo°]?\s*leil[ãa]o sfi|leil[ãa]o sfi)",
                )],
            )
            .with_field(Field::Image, vec![S::attr("img.fotoimovel", "src"), S::attr("img", "src")])
            .with_detail_field(Field::Description, vec![S::text("#dadosImovel .content"), S::text(".descricao")])
            .with_detail_field(
                Field::PrivateArea,
                vec![S::pattern(r"(?i)[áa]rea privativa\s*=?\s*([\d.,]+)\s*m")],
            )
            .with_detail_field(Field::TotalArea, vec![S::pattern(r"(?i)[áa]rea total\s*=?\s*([\d.,]+)\s*m")])
            .with_detail_field(Field::Bedrooms, vec![S::pattern(r"(?i)quartos:?\s*(\d+)")])
            .with_detail_field(Field::Parking, vec![S::pattern(r"(?i)garagem:?\s*(\d+)"), S::pattern(r"(?i)(\d+)\s*vagas?")])
            .with_detail_field(
                Field::AuctionDate,
                vec![S::pattern(r"(?i)data do (?:[12][ºo°]\s*)?leil[ãa]o\s*[-:]?\s*(\d{2}/\d{2}/\d{4}(?:\s*-?\s*\d{2}h\d{2})?)")],
            )
            .with_detail_field(Field::Round, vec![S::pattern(r"(?i)([12])[ºo°]\s*leil[ãa]o")])
            .with_detail_field(
                Field::PropertyType,
                vec![S::pattern(r"(?i)tipo de im[óo]vel:?\s*([A-Za-zÀ-ú]+)")],
            )
            .with_detail_field(Field::Image, vec![S::attr("#galeria-imagens img", "src"), S::attr(".galeria img", "src")])
            .with_pagination(PaginationPlan::default().with_page_param("pagina"))
    }

    fn search_urls(&self, query: &SearchQuery) -> Vec<SourceUrl> {
        self.config
            .sources
            .iter()
            .map(|source| match &query.state {
                Some(uf) => SourceUrl {
                    url: engine::with_query(&source.url, &[("estado", uf.to_uppercase())]),
                    partner: source.partner.clone(),
                },
                None => source.clone(),
            })
            .collect()
    }
}

/// Caixa cards lead with "TIPO - BAIRRO - CIDADE"; use it when no explicit
/// type was found.
fn refine(raw: &mut RawExtraction) {
    if !raw.contains(Field::PropertyType) {
        let kind = raw
            .get(Field::Title)
            .and_then(|t| t.split(" - ").next())
            .map(str::to_string);
        if let Some(kind) = kind {
            raw.insert(Field::PropertyType, kind);
        }
    }
    if !raw.contains(Field::Round) {
        let round = raw
            .get(Field::Modality)
            .and_then(|m| m.chars().find(|c| *c == '1' || *c == '2'));
        if let Some(round) = round {
            raw.insert(Field::Round, round.to_string());
        }
    }
}

#[async_trait]
impl SiteAdapter for CaixaAdapter {
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
        let mut raw = engine::collect_detail_page(session, &self.site, &self.config, url).await?;
        refine(&mut raw);
        Ok(raw)
    }
}
