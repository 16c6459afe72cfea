use crate::cli::{Action, Args};
use crate::config::Config;
use crate::db::scrapes::{end_scrape_run, start_scrape_run};
use crate::db::{compute_analytics, init_db, save_listings, Database};
use crate::pipeline::{new_run_id, HarvestOutcome, LogReporter, Orchestrator, ThreadSleeper};
use crate::scraper::HttpRenderer;
use anyhow::Context;
use clap::Parser;
use std::path::Path;

mod cli;
mod config;
mod db;
mod domain;
mod errors;
mod pipeline;
mod reports;
mod scraper;
mod spreadsheets;


fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.level_filter())
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    if let Err(e) = run(&args) {
        log::error!("❌ {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let db = Database::new(&cfg.database.path);
    init_db(&db).context("Failed to open storage")?;

    let csv_path = Path::new(&cfg.output.csv_file);

    match args.action() {
        Action::ShowStats => reports::show_stats(&db)?,
        Action::AvgPrice => reports::print_average_price(&db)?,
        Action::MaxPrice => reports::print_max_price(&db)?,
        Action::TopRated => reports::print_top_rated(&db)?,
        Action::ByLocation => reports::print_by_location(&db)?,
        Action::ExportCsv => {
            spreadsheets::export_csv(&db, csv_path)?;
        }
        Action::Harvest => harvest(&cfg, &db)?,
    }

    Ok(())
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Full pipeline, then save, export and analytics. Failures after the
/// harvest are logged and never throw away the harvested records.
fn harvest(cfg: &Config, db: &Database) -> anyhow::Result<()> {
    let run_id = new_run_id();
    let reporter = LogReporter::new(&run_id);
    let renderer = HttpRenderer::new(&cfg.scraper);
    let sleeper = ThreadSleeper;

    log::info!("🧵 Starting harvest {run_id} from {}", cfg.scraper.base_url);

    let run_row = db
        .with_conn(|conn| start_scrape_run(conn, &run_id, now_unix()))
        .map_err(|e| log::warn!("Could not record run start: {e}"))
        .ok();

    let outcome = match Orchestrator::new(&run_id, &renderer, &cfg.scraper, &reporter, &sleeper).run() {
        Ok(outcome) => outcome,
        Err(e) => {
            finish_run(db, run_row, None, 0, Some(e.to_string()));
            return Err(e.into());
        }
    };

    if outcome.is_empty() {
        log::warn!("⚠️ No listings scraped, nothing to save");
        finish_run(db, run_row, Some(&outcome), 0, Some("no listings scraped".into()));
        return Ok(());
    }

    if cfg.output.json_console {
        print_preview(&outcome);
    }

    log::info!("=== SAVING TO DATABASE ===");
    let saved = match save_listings(db, &outcome.records) {
        Ok(n) => n,
        Err(e) => {
            log::error!("Failed to save listings: {e}");
            0
        }
    };

    log::info!("=== EXPORTING TO CSV ===");
    if let Err(e) = spreadsheets::export_csv(db, Path::new(&cfg.output.csv_file)) {
        log::error!("Failed to export CSV: {e}");
    }

    log::info!("=== ANALYTICS SUMMARY ===");
    match compute_analytics(db) {
        Ok(a) => reports::print_analytics(&a),
        Err(e) => log::error!("Failed to calculate analytics: {e}"),
    }

    finish_run(db, run_row, Some(&outcome), saved, None);

    let s = &outcome.summary;
    println!("\n✅ HARVEST COMPLETE ({})", s.run_id);
    println!("Locations collected: {}/{} ({} skipped)", s.locations_collected, s.locations_found, s.locations_skipped);
    println!("Listings collected:  {}", s.listings_collected);
    println!("Records merged:      {}", outcome.record_count());
    println!("Details:             {} ok / {} failed", s.details_succeeded, s.details_failed);
    println!("Saved:               {saved}");
    println!("CSV file:            {}", cfg.output.csv_file);
    println!("\n💡 Run with --show-stats, --avg-price, --max-price, --top-rated, --by-location or --export-csv for reports.");

    Ok(())
}

fn finish_run(
    db: &Database,
    run_row: Option<i64>,
    outcome: Option<&HarvestOutcome>,
    saved: usize,
    error: Option<String>,
) {
    let Some(id) = run_row else { return };
    let summary = outcome.map(|o| &o.summary);
    if let Err(e) = db.with_conn(|conn| end_scrape_run(conn, id, now_unix(), summary, saved, error)) {
        log::warn!("Could not record run end: {e}");
    }
}

fn print_preview(outcome: &HarvestOutcome) {
    let preview = &outcome.records[..outcome.records.len().min(2)];
    match serde_json::to_string_pretty(preview) {
        Ok(json) => println!("{json}"),
        Err(e) => log::warn!("Could not render preview: {e}"),
    }
}
