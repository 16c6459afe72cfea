pub mod export_csv;

pub use export_csv::export_csv;
