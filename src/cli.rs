// cli.rs
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rental-harvester")]
#[command(about = "Harvest, store and report on vacation-rental listings", long_about = None)]
#[command(group(
    ArgGroup::new("report")
        .args(["show_stats", "avg_price", "max_price", "top_rated", "by_location", "export_csv"])
        .multiple(false)
))]
pub struct Args {
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: PathBuf,

    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Show all analytics statistics
    #[arg(long)]
    pub show_stats: bool,

    /// Show average price
    #[arg(long)]
    pub avg_price: bool,

    /// Show the most expensive listing
    #[arg(long)]
    pub max_price: bool,

    /// Show the top 5 highest rated listings
    #[arg(long)]
    pub top_rated: bool,

    /// Show listings grouped by location
    #[arg(long)]
    pub by_location: bool,

    /// Export stored listings to the configured CSV file
    #[arg(long)]
    pub export_csv: bool,
}

/// What a single invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Harvest,
    ShowStats,
    AvgPrice,
    MaxPrice,
    TopRated,
    ByLocation,
    ExportCsv,
}

impl Args {
    pub fn action(&self) -> Action {
        if self.show_stats {
            Action::ShowStats
        } else if self.avg_price {
            Action::AvgPrice
        } else if self.max_price {
            Action::MaxPrice
        } else if self.top_rated {
            Action::TopRated
        } else if self.by_location {
            Action::ByLocation
        } else if self.export_csv {
            Action::ExportCsv
        } else {
            Action::Harvest
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        match self.log_level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            "off" => log::LevelFilter::Off,
            _ => log::LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_means_harvest() {
        let args = Args::try_parse_from(["rental-harvester"]).unwrap();
        assert_eq!(args.action(), Action::Harvest);
        assert_eq!(args.config, PathBuf::from("config/config.yaml"));
    }

    #[test]
    fn report_flag_short_circuits() {
        let args = Args::try_parse_from(["rental-harvester", "--top-rated", "-c", "other.yaml"]).unwrap();
        assert_eq!(args.action(), Action::TopRated);
        assert_eq!(args.config, PathBuf::from("other.yaml"));
    }

    #[test]
    fn report_flags_are_mutually_exclusive() {
        let err = Args::try_parse_from(["rental-harvester", "--avg-price", "--export-csv"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let args = Args::try_parse_from(["rental-harvester", "--log-level", "chatty"]).unwrap();
        assert_eq!(args.level_filter(), log::LevelFilter::Info);
    }
}
