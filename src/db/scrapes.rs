use crate::errors::HarvestError;
use crate::pipeline::RunSummary;
use rusqlite::{params, Connection};

#[derive(Debug)]
pub struct ScrapeRun {
    pub id: i64,
    pub run_id: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub listings_collected: Option<i64>,
    pub listings_saved: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

pub fn start_scrape_run(conn: &Connection, run_id: &str, now: i64) -> Result<i64, HarvestError> {
    conn.execute(
        "INSERT INTO scrape_runs (run_id, started_at, success) VALUES (?, ?, 0)",
        params![run_id, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn end_scrape_run(
    conn: &Connection,
    id: i64,
    now: i64,
    summary: Option<&RunSummary>,
    saved: usize,
    error: Option<String>,
) -> Result<(), HarvestError> {
    let (found, skipped, collected, ok, failed) = summary
        .map(|s| {
            (
                s.locations_found,
                s.locations_skipped,
                s.listings_collected,
                s.details_succeeded,
                s.details_failed,
            )
        })
        .unwrap_or_default();

    conn.execute(
        "UPDATE scrape_runs SET finished_at = ?, locations_found = ?, locations_skipped = ?, listings_collected = ?, details_succeeded = ?, details_failed = ?, listings_saved = ?, success = ?, error_message = ? WHERE id = ?",
        params![now, found, skipped, collected, ok, failed, saved, error.is_none(), error, id],
    )?;
    Ok(())
}

pub fn get_recent_scrapes(conn: &Connection) -> Result<Vec<ScrapeRun>, HarvestError> {
    let mut stmt = conn.prepare(
        "SELECT id, run_id, started_at, finished_at, listings_collected, listings_saved, success, error_message FROM scrape_runs ORDER BY started_at DESC, id DESC LIMIT 50",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(ScrapeRun {
            id: row.get(0)?,
            run_id: row.get(1)?,
            started_at: row.get(2)?,
            finished_at: row.get(3)?,
            listings_collected: row.get(4)?,
            listings_saved: row.get(5)?,
            success: row.get(6)?,
            error_message: row.get(7)?,
        })
    })?;

    let mut runs = Vec::new();
    for r in rows {
        runs.push(r?);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::unique_temp_db;

    #[test]
    fn run_is_recorded_start_to_end() {
        let db = unique_temp_db("scrape_runs");
        let summary = RunSummary {
            run_id: "run-1".into(),
            locations_found: 2,
            locations_skipped: 1,
            listings_collected: 10,
            details_succeeded: 9,
            details_failed: 1,
            ..Default::default()
        };

        let runs = db
            .with_conn(|conn| {
                let id = start_scrape_run(conn, "run-1", 100)?;
                end_scrape_run(conn, id, 160, Some(&summary), 10, None)?;
                get_recent_scrapes(conn)
            })
            .unwrap();

        assert_eq!(runs.len(), 1);
        assert!(runs[0].success);
        assert_eq!(runs[0].finished_at, Some(160));
        assert_eq!(runs[0].listings_collected, Some(10));
        assert_eq!(runs[0].listings_saved, Some(10));
    }

    #[test]
    fn failed_run_keeps_its_error() {
        let db = unique_temp_db("scrape_runs_failed");
        let runs = db
            .with_conn(|conn| {
                let id = start_scrape_run(conn, "run-2", 5)?;
                end_scrape_run(conn, id, 6, None, 0, Some("No locations discovered".into()))?;
                get_recent_scrapes(conn)
            })
            .unwrap();

        assert!(!runs[0].success);
        assert_eq!(runs[0].error_message.as_deref(), Some("No locations discovered"));
    }
}
