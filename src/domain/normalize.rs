// src/domain/normalize.rs
//
// Text-to-number helpers for card and detail text. None of these fail: text
// that cannot be read as a number becomes zero so one bad field never costs
// the rest of the record.

use once_cell::sync::Lazy;
use regex::Regex;

static PRICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*\.?\d*").unwrap());
static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.?\d*").unwrap());
static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub const MAX_RATING: f64 = 5.0;

/// "$1,234.50" -> 1234.5, "£150 AUD" -> 150.0
pub fn normalize_price(raw: &str) -> f64 {
    PRICE_RE
        .find(raw)
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// "4.95 (120 reviews)" -> 4.95, capped at 5.0.
pub fn normalize_rating(raw: &str) -> f64 {
    extract_decimal(raw).min(MAX_RATING)
}

/// First decimal number in the text, e.g. "1.5 baths" -> 1.5.
pub fn extract_decimal(raw: &str) -> f64 {
    DECIMAL_RE
        .find(raw)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// First integer in the text, e.g. "3 bedrooms" -> 3.
pub fn extract_number(raw: &str) -> i64 {
    INTEGER_RE
        .find(raw)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}

pub fn clean_text(raw: &str) -> String {
    SPACES_RE.replace_all(raw.trim(), " ").into_owned()
}
