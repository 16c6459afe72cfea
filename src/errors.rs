// errors.rs
use crate::scraper::ScraperError;
use thiserror::Error;

/// Errors that can end a harvest run or a reporting command.
///
/// Per-location and per-detail failures never show up here: they are absorbed
/// where they happen and surface only as counts in the run summary.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("No locations discovered at {0}")]
    DiscoveryEmpty(String),
    #[error("Location discovery failed: {0}")]
    Discovery(#[source] ScraperError),
    #[error("Database error: {0}")]
    Db(String),
    #[error("Export error: {0}")]
    Export(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for HarvestError {
    fn from(e: rusqlite::Error) -> Self {
        HarvestError::Db(e.to_string())
    }
}
