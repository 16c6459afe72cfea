use crate::scraper::ScraperError;
use serde::{Deserialize, Serialize};

// Location
//  ├── name   "Lisbon"
//  └── url    https://site/s/Lisbon/homes
//
// RawListing
//  ├── url, title, location_name
//  ├── price_text, rating_text       (raw card text, converted later)
//  └── bedrooms, bathrooms, guests   (zero until merged with detail data)

/// A navigable grouping of listings found on the entry page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub url: String,
}

/// One listing card as collected from a location's results pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub url: String,
    pub title: String,
    pub price_text: String,
    pub rating_text: String,
    pub location_name: String,

    pub bedrooms: i64,
    pub bathrooms: f64,
    pub guests: i64,
}

/// Fields pulled off a listing's detail page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailFields {
    pub bedrooms: i64,
    // Half-baths are common, so the fraction is kept all the way to storage.
    pub bathrooms: f64,
    pub guests: i64,
}

/// Final outcome of the attempt sequence for one canonical URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailResult {
    pub url_key: String,
    pub bedrooms: i64,
    pub bathrooms: f64,
    pub guests: i64,
    pub attempts: u32,
    pub error: Option<ScraperError>,
}

impl DetailResult {
    pub fn success(url_key: impl Into<String>, fields: DetailFields, attempts: u32) -> Self {
        Self {
            url_key: url_key.into(),
            bedrooms: fields.bedrooms,
            bathrooms: fields.bathrooms,
            guests: fields.guests,
            attempts,
            error: None,
        }
    }

    pub fn failure(url_key: impl Into<String>, error: ScraperError, attempts: u32) -> Self {
        Self {
            url_key: url_key.into(),
            bedrooms: 0,
            bathrooms: 0.0,
            guests: 0,
            attempts,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
