// reports.rs
use crate::db::analytics::LocationStats;
use crate::db::scrapes::{get_recent_scrapes, ScrapeRun};
use crate::db::{compute_analytics, AnalyticsSummary, Database};
use crate::domain::listing::StoredListing;
use crate::errors::HarvestError;

fn listing_line(l: &StoredListing) -> String {
    format!(
        "{} ({}) - ${:.2}, ★ {:.2}, {} bd / {} ba / {} guests\n     {}",
        l.title, l.location_name, l.price, l.rating, l.bedrooms, l.bathrooms, l.guests, l.url
    )
}

fn location_line(s: &LocationStats) -> String {
    format!(
        "{:<28} {:>4} listings   avg ${:>8.2}   avg ★ {:.2}",
        s.location_name, s.listings, s.average_price, s.average_rating
    )
}

pub fn print_analytics(a: &AnalyticsSummary) {
    println!("\n📊 ANALYTICS");
    println!("Total listings:   {}", a.total_listings);
    println!("Priced listings:  {}", a.priced_listings);
    println!("Average price:    ${:.2}", a.average_price);
    println!("Minimum price:    ${:.2}", a.min_price);
    match &a.max_price {
        Some(l) => println!("Maximum price:    ${:.2} ({})", l.price, l.title),
        None => println!("Maximum price:    n/a"),
    }
    println!("Average rating:   {:.2}", a.average_rating);

    print_top_rated_list(&a.top_rated);
    print_location_list(&a.by_location);
}

fn print_top_rated_list(top: &[StoredListing]) {
    println!("\n🏆 Top rated");
    if top.is_empty() {
        println!("  (no rated listings)");
    }
    for (i, l) in top.iter().enumerate() {
        println!("  {}. {}", i + 1, listing_line(l));
    }
}

fn print_location_list(rows: &[LocationStats]) {
    println!("\n📍 By location");
    if rows.is_empty() {
        println!("  (no listings)");
    }
    for s in rows {
        println!("  {}", location_line(s));
    }
}

fn run_line(r: &ScrapeRun) -> String {
    let status = match (&r.finished_at, r.success) {
        (None, _) => "running".to_string(),
        (Some(_), true) => "ok".to_string(),
        (Some(_), false) => format!("failed: {}", r.error_message.as_deref().unwrap_or("unknown")),
    };
    let started = chrono::DateTime::<chrono::Utc>::from_timestamp(r.started_at, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    format!(
        "#{} {} {started} collected {} saved {} ({status})",
        r.id,
        r.run_id,
        r.listings_collected.unwrap_or(0),
        r.listings_saved.unwrap_or(0)
    )
}

pub fn show_stats(db: &Database) -> Result<(), HarvestError> {
    print_analytics(&compute_analytics(db)?);

    let runs = db.with_conn(|conn| get_recent_scrapes(conn))?;
    println!("\n🕒 Recent runs");
    if runs.is_empty() {
        println!("  (none recorded)");
    }
    for r in runs.iter().take(5) {
        println!("  {}", run_line(r));
    }
    Ok(())
}

pub fn print_average_price(db: &Database) -> Result<(), HarvestError> {
    let a = compute_analytics(db)?;
    println!(
        "Average price: ${:.2} across {} priced listings",
        a.average_price, a.priced_listings
    );
    Ok(())
}

pub fn print_max_price(db: &Database) -> Result<(), HarvestError> {
    match compute_analytics(db)?.max_price {
        Some(l) => println!("Most expensive: {}", listing_line(&l)),
        None => println!("No priced listings stored yet"),
    }
    Ok(())
}

pub fn print_top_rated(db: &Database) -> Result<(), HarvestError> {
    print_top_rated_list(&compute_analytics(db)?.top_rated);
    Ok(())
}

pub fn print_by_location(db: &Database) -> Result<(), HarvestError> {
    print_location_list(&compute_analytics(db)?.by_location);
    Ok(())
}
