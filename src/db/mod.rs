pub mod analytics;
pub mod connection;
pub mod listings;
pub mod scrapes;

pub use analytics::{compute_analytics, AnalyticsSummary};
pub use connection::{init_db, Database};
pub use listings::{all_listings, save_listings};
