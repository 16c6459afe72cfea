pub mod listing;
pub mod normalize;

pub use listing::NormalizedListing;
