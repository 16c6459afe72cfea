use crate::db::connection::Database;
use crate::db::listings::{row_to_listing, LISTING_COLUMNS};
use crate::domain::listing::StoredListing;
use crate::errors::HarvestError;
use rusqlite::{Connection, OptionalExtension};

pub const TOP_RATED_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct LocationStats {
    pub location_name: String,
    pub listings: i64,
    pub average_price: f64,
    pub average_rating: f64,
}

/// Aggregates over everything stored. Zero prices and ratings mean "unknown"
/// and are left out of the price and rating figures.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSummary {
    pub total_listings: i64,
    pub priced_listings: i64,
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: Option<StoredListing>,
    pub average_rating: f64,
    pub top_rated: Vec<StoredListing>,
    pub by_location: Vec<LocationStats>,
}

pub fn compute_analytics(db: &Database) -> Result<AnalyticsSummary, HarvestError> {
    db.with_conn(|conn| {
        let total_listings: i64 = conn.query_row("SELECT COUNT(*) FROM listings", [], |r| r.get(0))?;

        let (priced_listings, average_price, min_price): (i64, f64, f64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(AVG(price), 0), COALESCE(MIN(price), 0) FROM listings WHERE price > 0",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;

        let average_rating: f64 = conn.query_row(
            "SELECT COALESCE(AVG(rating), 0) FROM listings WHERE rating > 0",
            [],
            |r| r.get(0),
        )?;

        Ok(AnalyticsSummary {
            total_listings,
            priced_listings,
            average_price,
            min_price,
            max_price: max_price_listing(conn)?,
            average_rating,
            top_rated: top_rated(conn, TOP_RATED_LIMIT)?,
            by_location: by_location(conn)?,
        })
    })
}

fn max_price_listing(conn: &Connection) -> Result<Option<StoredListing>, HarvestError> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE price > 0 ORDER BY price DESC, id ASC LIMIT 1");
    Ok(conn.query_row(&sql, [], row_to_listing).optional()?)
}

fn top_rated(conn: &Connection, limit: usize) -> Result<Vec<StoredListing>, HarvestError> {
    let sql = format!(
        "SELECT {LISTING_COLUMNS} FROM listings WHERE rating > 0 ORDER BY rating DESC, price ASC, id ASC LIMIT ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([limit as i64], row_to_listing)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn by_location(conn: &Connection) -> Result<Vec<LocationStats>, HarvestError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT location_name,
               COUNT(*),
               COALESCE(AVG(NULLIF(price, 0)), 0),
               COALESCE(AVG(NULLIF(rating, 0)), 0)
        FROM listings
        GROUP BY location_name
        ORDER BY COUNT(*) DESC, location_name ASC
        "#,
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(LocationStats {
            location_name: row.get(0)?,
            listings: row.get(1)?,
            average_price: row.get(2)?,
            average_rating: row.get(3)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
