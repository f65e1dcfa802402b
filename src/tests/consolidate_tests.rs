// src/tests/consolidate_tests.rs
use super::utils::listing;
use crate::consolidate::{consolidate, consolidate_by, populated_field_count, KeyStrategy};
use crate::domain::Listing;

fn richer(mut l: Listing) -> Listing {
    l.address = format!("Rua {}, 100", l.neighborhood);
    l.bedrooms = 2;
    l.private_area_m2 = 60.0;
    l.images = vec!["https://img.test/a.jpg".into()];
    l
}

#[test]
fn richer_duplicates_replace_sparse_ones_in_place() {
    let a: Vec<Listing> = (0..10)
        .map(|i| listing("caixa", &i.to_string(), &format!("Bairro {i}"), 100_000.0 + i as f64))
        .collect();
    let mut b: Vec<Listing> = (0..10)
        .map(|i| richer(listing("zuk", &i.to_string(), &format!("Bairro {i}"), 100_000.0 + i as f64)))
        .collect();
    b.extend((10..15).map(|i| listing("zuk", &i.to_string(), &format!("Bairro {i}"), 100_000.0 + i as f64)));

    let merged = consolidate(a.into_iter().chain(b).collect());

    assert_eq!(merged.len(), 15);
    for (i, l) in merged.iter().enumerate().take(10) {
        assert_eq!(l.source, "zuk", "slot {i} should hold the richer record");
        assert_eq!(l.neighborhood, format!("Bairro {i}"));
    }
}

#[test]
fn ties_keep_first_seen() {
    let first = listing("caixa", "1", "Moema", 300_000.0);
    let second = listing("zuk", "1", "Moema", 300_000.0);
    let merged = consolidate(vec![first, second]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].source, "caixa");
}

#[test]
fn key_folds_accents_and_case() {
    let a = listing("caixa", "1", "Tatuapé", 250_000.0);
    let b = richer(listing("zuk", "2", "  tatuape ", 250_000.0));
    let merged = consolidate(vec![a, b]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].source, "zuk");
}

#[test]
fn different_prices_are_different_units() {
    let merged = consolidate(vec![
        listing("caixa", "1", "Moema", 300_000.0),
        listing("zuk", "2", "Moema", 300_000.01),
    ]);
    assert_eq!(merged.len(), 2);
}

#[test]
fn unpriced_listings_are_never_merged() {
    let merged = consolidate(vec![
        listing("caixa", "1", "", 0.0),
        listing("zuk", "2", "", 0.0),
        listing("resale", "3", "", 0.0),
        listing("caixa", "4", "Moema", 0.0),
        listing("zuk", "5", "Moema", 0.0),
    ]);
    assert_eq!(merged.len(), 5);
    assert!(merged.iter().all(|l| l.incomplete));
}

#[test]
fn unpriced_listing_does_not_absorb_a_priced_one() {
    let priced = listing("caixa", "1", "Moema", 300_000.0);
    let mut unpriced = richer(listing("zuk", "2", "Moema", 0.0));
    unpriced.description = "Sem preço".into();
    let merged = consolidate(vec![priced, unpriced, listing("zuk", "3", "Moema", 300_000.0)]);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].source, "caixa");
    assert!(merged[1].incomplete);
}

#[test]
fn bookkeeping_fields_do_not_count() {
    let mut a = listing("caixa", "1", "Moema", 300_000.0);
    let base = populated_field_count(&a);
    a.incomplete = true;
    a.source_id = "caixa:something-much-longer".into();
    assert_eq!(populated_field_count(&a), base);
    a.description = "Apartamento com varanda".into();
    assert_eq!(populated_field_count(&a), base + 1);
}

struct ByUrl;

impl KeyStrategy for ByUrl {
    type Key = String;

    fn key(&self, listing: &Listing) -> String {
        listing.source_url.clone()
    }
}

#[test]
fn custom_key_strategy() {
    let merged = consolidate_by(
        vec![
            listing("caixa", "1", "Moema", 300_000.0),
            listing("caixa", "1", "Pinheiros", 410_000.0),
            listing("caixa", "2", "Moema", 300_000.0),
        ],
        &ByUrl,
    );
    assert_eq!(merged.len(), 2);
}
