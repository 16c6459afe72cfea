// merge.rs
use crate::domain::NormalizedListing;
use crate::pipeline::canonical::canonical_key;
use crate::scraper::models::{DetailResult, RawListing};
use std::collections::{BTreeSet, HashMap};

/// Deduplicated canonical keys of every listing that has a URL.
pub fn unique_url_keys(listings: &[RawListing]) -> BTreeSet<String> {
    listings
        .iter()
        .filter(|l| !l.url.trim().is_empty())
        .map(|l| canonical_key(&l.url))
        .collect()
}

/// Join bulk listings with detail results by canonical key.
///
/// Detail values are applied only from successful results; anything else
/// keeps the collection-stage numbers. Inputs are never modified.
pub fn merge(
    listings: &[RawListing],
    details: &HashMap<String, DetailResult>,
) -> Vec<NormalizedListing> {
    listings
        .iter()
        .map(|raw| {
            let key = canonical_key(&raw.url);
            let mut out = NormalizedListing::from_raw(raw, key);

            if let Some(detail) = details.get(&out.url_key).filter(|d| d.is_success()) {
                out.bedrooms = detail.bedrooms;
                out.bathrooms = detail.bathrooms;
                out.guests = detail.guests;
            }

            out
        })
        .collect()
}
