// src/extract/selectors.rs

//! Fallback selector chains.
//!
//! Every field is located through an ordered list of strategies. The first
//! strategy producing non-empty text wins, so the configured order doubles as
//! markup-version priority: newest layout first, broadest fallback last.

use crate::errors::ExtractionError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// Serializable description of one extraction strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategySpec {
    /// Text content of the first element matching `css`.
    Text { css: String },
    /// Attribute of the first matching element that carries it.
    Attr { css: String, attr: String },
    /// First capture group of `regex` over the scope text, or over the text /
    /// attribute of the first element matching `css`.
    Pattern {
        regex: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        css: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attr: Option<String>,
    },
}

impl StrategySpec {
    pub fn text(css: &str) -> Self {
        StrategySpec::Text { css: css.to_string() }
    }

    pub fn attr(css: &str, attr: &str) -> Self {
        StrategySpec::Attr {
            css: css.to_string(),
            attr: attr.to_string(),
        }
    }

    pub fn pattern(regex: &str) -> Self {
        StrategySpec::Pattern {
            regex: regex.to_string(),
            css: None,
            attr: None,
        }
    }

    pub fn attr_pattern(css: &str, attr: &str, regex: &str) -> Self {
        StrategySpec::Pattern {
            regex: regex.to_string(),
            css: Some(css.to_string()),
            attr: Some(attr.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    Text(Selector),
    Attr(Selector, String),
    Pattern {
        regex: Regex,
        target: Option<(Selector, Option<String>)>,
    },
}

pub(crate) fn compile_selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::InvalidSelector {
        selector: css.to_string(),
        reason: format!("{e:?}"),
    })
}

fn compile_regex(pattern: &str) -> Result<Regex, ExtractionError> {
    Regex::new(pattern).map_err(|e| ExtractionError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Collapses runs of whitespace (including nbsp) into single spaces.
pub fn clean_text(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

impl Strategy {
    fn compile(spec: &StrategySpec) -> Result<Self, ExtractionError> {
        Ok(match spec {
            StrategySpec::Text { css } => Strategy::Text(compile_selector(css)?),
            StrategySpec::Attr { css, attr } => Strategy::Attr(compile_selector(css)?, attr.clone()),
            StrategySpec::Pattern { regex, css, attr } => Strategy::Pattern {
                regex: compile_regex(regex)?,
                target: match css {
                    Some(css) => Some((compile_selector(css)?, attr.clone())),
                    None => None,
                },
            },
        })
    }

    fn apply_all(&self, scope: ElementRef<'_>) -> Vec<String> {
        match self {
            Strategy::Text(sel) => scope
                .select(sel)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect(),
            Strategy::Attr(sel, attr) => scope
                .select(sel)
                .filter_map(|el| el.value().attr(attr))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
            Strategy::Pattern { regex, target } => {
                let haystacks: Vec<String> = match target {
                    None => vec![element_text(scope)],
                    Some((sel, None)) => scope.select(sel).map(element_text).collect(),
                    Some((sel, Some(attr))) => scope
                        .select(sel)
                        .filter_map(|el| el.value().attr(attr))
                        .map(str::to_string)
                        .collect(),
                };
                haystacks
                    .iter()
                    .filter_map(|h| regex.captures(h))
                    .filter_map(|c| c.get(1).or_else(|| c.get(0)))
                    .map(|m| clean_text(m.as_str()))
                    .filter(|t| !t.is_empty())
                    .collect()
            }
        }
    }

    fn apply(&self, scope: ElementRef<'_>) -> Option<String> {
        // Only the first hit matters; avoid walking the whole subtree twice.
        match self {
            Strategy::Text(sel) => scope
                .select(sel)
                .map(element_text)
                .find(|t| !t.is_empty()),
            _ => self.apply_all(scope).into_iter().next(),
        }
    }
}

/// Compiled, ordered strategy list for one field.
#[derive(Debug, Clone, Default)]
pub struct FallbackChain {
    strategies: Vec<Strategy>,
}

impl FallbackChain {
    pub fn compile(specs: &[StrategySpec]) -> Result<Self, ExtractionError> {
        let strategies = specs
            .iter()
            .map(Strategy::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { strategies })
    }

    /// First non-empty result in chain order.
    pub fn resolve(&self, scope: ElementRef<'_>) -> Option<String> {
        self.strategies.iter().find_map(|s| s.apply(scope))
    }

    /// Every match of the first strategy that matches anything.
    pub fn resolve_all(&self, scope: ElementRef<'_>) -> Vec<String> {
        self.strategies
            .iter()
            .map(|s| s.apply_all(scope))
            .find(|hits| !hits.is_empty())
            .unwrap_or_default()
    }

    pub fn resolve_in(&self, document: &Html) -> Option<String> {
        self.resolve(document.root_element())
    }
}

/// Ordered card-container selectors; the first one with any match is used.
#[derive(Debug, Clone)]
pub struct CardLocator {
    selectors: Vec<Selector>,
}

impl CardLocator {
    pub fn compile(selectors: &[String]) -> Result<Self, ExtractionError> {
        let selectors = selectors
            .iter()
            .map(|s| compile_selector(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { selectors })
    }

    pub fn locate<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        self.selectors
            .iter()
            .map(|sel| document.select(sel).collect::<Vec<_>>())
            .find(|cards| !cards.is_empty())
            .unwrap_or_default()
    }
}
