use crate::db::connection::Database;
use crate::domain::listing::StoredListing;
use crate::domain::NormalizedListing;
use crate::errors::HarvestError;
use chrono::Utc;
use rusqlite::{params, Row};
use std::collections::HashSet;

pub(crate) const LISTING_COLUMNS: &str =
    "id, url, title, location_name, price, rating, bedrooms, bathrooms, guests, scraped_at";

pub(crate) fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<StoredListing> {
    Ok(StoredListing {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        location_name: row.get(3)?,
        price: row.get(4)?,
        rating: row.get(5)?,
        bedrooms: row.get(6)?,
        bathrooms: row.get(7)?,
        guests: row.get(8)?,
        scraped_at: row.get(9)?,
    })
}

/// Upsert listings by canonical key in one transaction.
///
/// Returns how many distinct listings were written. Rows without a key are
/// skipped.
pub fn save_listings(db: &Database, listings: &[NormalizedListing]) -> Result<usize, HarvestError> {
    let now = Utc::now().naive_utc();

    db.with_conn(|conn| {
        let tx = conn.transaction()?;
        let mut saved = HashSet::new();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO listings (
                    url_key, url, title, location_name,
                    price, rating, bedrooms, bathrooms, guests, scraped_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(url_key) DO UPDATE SET
                    url = excluded.url,
                    title = excluded.title,
                    location_name = excluded.location_name,
                    price = excluded.price,
                    rating = excluded.rating,
                    bedrooms = excluded.bedrooms,
                    bathrooms = excluded.bathrooms,
                    guests = excluded.guests,
                    scraped_at = excluded.scraped_at
                "#,
            )?;

            for l in listings {
                if l.url_key.is_empty() {
                    log::warn!("Skipping listing without url: '{}'", l.title);
                    continue;
                }

                stmt.execute(params![
                    l.url_key,
                    l.url,
                    l.title,
                    l.location_name,
                    l.price,
                    l.rating,
                    l.bedrooms,
                    l.bathrooms,
                    l.guests,
                    now,
                ])?;
                saved.insert(l.url_key.as_str());
            }
        }

        tx.commit()?;
        Ok(saved.len())
    })
}

pub fn all_listings(db: &Database) -> Result<Vec<StoredListing>, HarvestError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings ORDER BY location_name, title, id"
        ))?;

        let rows = stmt.query_map([], row_to_listing)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    })
}
