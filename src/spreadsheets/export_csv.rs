use crate::db::{all_listings, Database};
use crate::domain::listing::StoredListing;
use crate::errors::HarvestError;
use std::path::Path;

const HEADERS: [&str; 10] = [
    "ID",
    "Title",
    "Location",
    "Price",
    "Rating",
    "Bedrooms",
    "Bathrooms",
    "Guests",
    "URL",
    "Scraped At",
];

/// Write listings to `path`, header row first. Returns the number of rows.
pub fn export_listings_csv(listings: &[StoredListing], path: &Path) -> Result<usize, HarvestError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| HarvestError::Export(format!("Failed to create {}: {e}", path.display())))?;

    writer
        .write_record(HEADERS)
        .map_err(|e| HarvestError::Export(format!("Failed to write header: {e}")))?;

    for l in listings {
        writer
            .write_record([
                l.id.to_string(),
                l.title.clone(),
                l.location_name.clone(),
                format!("{:.2}", l.price),
                format!("{:.2}", l.rating),
                l.bedrooms.to_string(),
                l.bathrooms.to_string(),
                l.guests.to_string(),
                l.url.clone(),
                l.scraped_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ])
            .map_err(|e| HarvestError::Export(format!("Failed to write listing {}: {e}", l.id)))?;
    }

    writer.flush()?;
    Ok(listings.len())
}

/// Export everything currently stored.
pub fn export_csv(db: &Database, path: &Path) -> Result<usize, HarvestError> {
    let listings = all_listings(db)?;
    let rows = export_listings_csv(&listings, path)?;
    log::info!("✅ Exported {rows} listings to {}", path.display());
    Ok(rows)
}
