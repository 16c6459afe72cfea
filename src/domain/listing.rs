use crate::domain::normalize::{clean_text, normalize_price, normalize_rating};
use crate::scraper::models::RawListing;
use serde::Serialize;

/// A listing ready for storage: text converted to numbers, detail data applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedListing {
    pub url_key: String,
    pub url: String,
    pub title: String,
    pub location_name: String,

    pub price: f64,
    pub rating: f64,

    pub bedrooms: i64,
    pub bathrooms: f64,
    pub guests: i64,
}

impl NormalizedListing {
    pub fn from_raw(raw: &RawListing, url_key: String) -> Self {
        Self {
            url_key,
            url: raw.url.trim().to_string(),
            title: clean_text(&raw.title),
            location_name: clean_text(&raw.location_name),
            price: normalize_price(&raw.price_text),
            rating: normalize_rating(&raw.rating_text),
            bedrooms: raw.bedrooms,
            bathrooms: raw.bathrooms,
            guests: raw.guests,
        }
    }
}

/// A listing as read back from the `listings` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredListing {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub location_name: String,
    pub price: f64,
    pub rating: f64,
    pub bedrooms: i64,
    pub bathrooms: f64,
    pub guests: i64,
    pub scraped_at: chrono::NaiveDateTime,
}
