// src/extract/parse.rs

//! Text → number coercion for pt-BR listing markup.
//!
//! `.` groups thousands and `,` separates decimals ("R$ 120.000,00").
//! Every function returns `0` when nothing numeric is found; callers treat
//! zero as "unextracted", never as a real value.

use regex::Regex;
use std::sync::OnceLock;

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d.,]*").expect("static regex"))
}

fn area_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d[\d.,]*)\s*(?:m²|m2|mts|metros|m\b)").expect("static regex")
    })
}

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d[\d.,]*)\s*%").expect("static regex"))
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

/// Converts one numeric token ("120.000,00", "72.5", "1.500") to f64.
///
/// A lone `.` followed by exactly three digits is a thousands separator,
/// anything else after a lone `.` is a decimal part.
fn to_number(token: &str) -> f64 {
    let token = token.trim_end_matches(['.', ',']);

    let normalized = match token.rsplit_once(',') {
        Some((int, frac)) => format!("{}.{}", int.replace(['.', ','], ""), frac),
        None => {
            let dots = token.matches('.').count();
            match token.rsplit_once('.') {
                Some((int, frac)) if dots == 1 && frac.len() != 3 => format!("{int}.{frac}"),
                _ => token.replace('.', ""),
            }
        }
    };

    normalized.parse().unwrap_or(0.0)
}

fn first_number(text: &str) -> f64 {
    number_re()
        .find(text)
        .map(|m| to_number(m.as_str()))
        .unwrap_or(0.0)
}

fn is_ordinal_mark(c: char) -> bool {
    matches!(c, 'ª' | 'º' | '°')
}

/// "R$ 120.000,00" → 120000.0. When a currency marker is present the first
/// amount after it wins, so "2ª praça: R$ 80.000,00" yields 80000. Ordinals
/// ("2ª", "1º") are never amounts.
pub fn parse_price(text: &str) -> f64 {
    let scope = text.find("R$").map(|i| &text[i + 2..]).unwrap_or(text);
    number_re()
        .find_iter(scope)
        .find(|m| !scope[m.end()..].starts_with(is_ordinal_mark))
        .map(|m| to_number(m.as_str()))
        .unwrap_or(0.0)
}

/// "72,50 m²" → 72.5; "Área privativa 1.250m2" → 1250.
pub fn parse_area(text: &str) -> f64 {
    match area_re().captures(text).and_then(|c| c.get(1)) {
        Some(m) => to_number(m.as_str()),
        None => first_number(text),
    }
}

/// "3 quartos" → 3; "Vagas: 02" → 2.
pub fn parse_count(text: &str) -> u32 {
    digits_re()
        .find(text)
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}

/// "Desconto de 45,5%" → 45.5; "-40%" → 40.
pub fn parse_percent(text: &str) -> f64 {
    match percent_re().captures(text).and_then(|c| c.get(1)) {
        Some(m) => to_number(m.as_str()),
        None => first_number(text),
    }
}
