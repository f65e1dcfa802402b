// src/domain/logic.rs

use crate::domain::listing::AuctionRound;

/// Discount (in percent) at or above which a listing is treated as being in
/// its second auction round when the page does not say so.
pub const SECOND_ROUND_DISCOUNT: f64 = 30.0;

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'ª' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'º' | '°' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Lowercases, folds Portuguese accents and collapses whitespace.
/// "  Jardim   Paulistâno " → "jardim paulistano".
pub fn normalize_text(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(fold_char)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `(1 - asking / appraised) * 100`, clamped to zero. Zero when either side
/// is unknown.
pub fn derive_discount(asking_price: f64, appraised_value: f64) -> f64 {
    if appraised_value <= 0.0 || asking_price <= 0.0 {
        return 0.0;
    }
    ((1.0 - asking_price / appraised_value) * 100.0).max(0.0)
}

/// Reads an explicit round label such as "2º Leilão", "Segunda praça" or
/// "Praça única".
pub fn parse_round_label(label: &str) -> Option<AuctionRound> {
    let text = normalize_text(label);
    if text.contains("segund") {
        return Some(AuctionRound::Second);
    }
    if text.contains("primeir") || text.contains("unic") {
        return Some(AuctionRound::First);
    }
    match text.chars().find(|c| c.is_ascii_digit()) {
        Some('2') => Some(AuctionRound::Second),
        Some('1') => Some(AuctionRound::First),
        _ => None,
    }
}

/// Explicit label first; otherwise a discount of 30% or more implies the
/// second round.
pub fn derive_auction_round(label: Option<&str>, discount_percent: f64) -> AuctionRound {
    if let Some(round) = label.and_then(parse_round_label) {
        return round;
    }
    if discount_percent >= SECOND_ROUND_DISCOUNT {
        AuctionRound::Second
    } else {
        AuctionRound::First
    }
}

/// Maps free-text property descriptions to a small canonical vocabulary.
/// Order matters: "casa em condomínio" is a house, "sala comercial" is
/// commercial, "apartamento duplex" is an apartment.
pub fn canonical_property_type(text: &str) -> String {
    let text = normalize_text(text);
    let kind = if text.contains("apart") || text.contains("apto") || text.contains("flat") || text.contains("cobertura") || text.contains("kitnet") || text.contains("studio") {
        "apartamento"
    } else if text.contains("sobrado") {
        "sobrado"
    } else if text.contains("casa") || text.contains("residencia") {
        "casa"
    } else if text.contains("terreno") || text.contains("lote") || text.contains("gleba") {
        "terreno"
    } else if text.contains("galpao") || text.contains("armazem") {
        "galpao"
    } else if text.contains("sala") || text.contains("loja") || text.contains("comercial") || text.contains("predio") {
        "comercial"
    } else if text.contains("rural") || text.contains("fazenda") || text.contains("sitio") || text.contains("chacara") {
        "rural"
    } else {
        ""
    };
    kind.to_string()
}
