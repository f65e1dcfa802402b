// src/domain/locality.rs

//! Shared locality parsing for free-text auction addresses.
//!
//! Addresses on these sites look like
//! `"Rua das Flores, 120, Apto 31 - Vila Mariana - São Paulo/SP"` or
//! `"Av. Brasil, 500 - Centro - Campinas - SP"`. Segments are split on `" - "`;
//! the city/state token is either `City/UF` or a `City`, `UF` pair, and the
//! segment right before it is the neighborhood.

const STATES: [&str; 27] = [
    "AC", "AL", "AM", "AP", "BA", "CE", "DF", "ES", "GO", "MA", "MG", "MS", "MT", "PA", "PB",
    "PE", "PI", "PR", "RJ", "RN", "RO", "RR", "RS", "SC", "SE", "SP", "TO",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Locality {
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// Returns the canonical two-letter code when `token` is a Brazilian state.
pub fn state_code(token: &str) -> Option<&'static str> {
    let token = token.trim();
    if token.len() != 2 {
        return None;
    }
    STATES
        .iter()
        .find(|uf| uf.eq_ignore_ascii_case(token))
        .copied()
}

pub fn parse_locality(address: &str, default_city: &str, default_state: &str) -> Locality {
    let segments: Vec<&str> = address
        .split(" - ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    for i in (0..segments.len()).rev() {
        let seg = segments[i];

        // "São Paulo/SP"
        if let Some((city, uf)) = seg.rsplit_once('/') {
            if let Some(state) = state_code(uf) {
                let city = city.trim();
                return Locality {
                    neighborhood: neighborhood_before(&segments, i),
                    city: if city.is_empty() { default_city.to_string() } else { city.to_string() },
                    state: state.to_string(),
                };
            }
        }

        // "... - Campinas - SP"
        if let Some(state) = state_code(seg) {
            if i == 0 {
                break;
            }
            return Locality {
                neighborhood: neighborhood_before(&segments, i - 1),
                city: segments[i - 1].to_string(),
                state: state.to_string(),
            };
        }
    }

    // No state token: the city is unrecoverable. The last segment, if the
    // address has more than one, is the best guess at the neighborhood.
    Locality {
        neighborhood: if segments.len() > 1 {
            segments[segments.len() - 1].to_string()
        } else {
            String::new()
        },
        city: default_city.to_string(),
        state: default_state.to_string(),
    }
}

fn neighborhood_before(segments: &[&str], token_index: usize) -> String {
    if token_index == 0 {
        String::new()
    } else {
        segments[token_index - 1].to_string()
    }
}
