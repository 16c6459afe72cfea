// report.rs
use crate::scraper::models::DetailResult;
use crate::scraper::ScraperError;
use std::time::Duration;

/// Counts describing how a harvest run went, reported even on partial failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub locations_found: usize,
    pub locations_collected: usize,
    pub locations_skipped: usize,
    pub listings_collected: usize,
    pub unique_urls: usize,
    pub details_succeeded: usize,
    pub details_failed: usize,
    pub enrichment_skipped: bool,
    pub elapsed: Duration,
}

/// Progress sink handed to the orchestrator and the detail pool.
///
/// Every method has a no-op default so a reporter only implements what it
/// cares about.
pub trait RunReporter: Send + Sync {
    fn stage(&self, _name: &str) {}

    fn locations_found(&self, _count: usize) {}

    fn location_collected(&self, _name: &str, _listings: usize) {}

    fn location_skipped(&self, _name: &str, _reason: &str) {}

    fn worker_started(&self, _worker: usize) {}

    fn worker_finished(&self, _worker: usize, _handled: usize) {}

    fn detail_attempt_failed(&self, _url_key: &str, _attempt: u32, _max: u32, _err: &ScraperError) {}

    fn detail_finished(&self, _worker: usize, _result: &DetailResult) {}

    fn summary(&self, _summary: &RunSummary) {}
}

/// Writes run progress through the `log` facade, tagged with the run id.
pub struct LogReporter {
    run_id: String,
}

impl LogReporter {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }
}

impl RunReporter for LogReporter {
    fn stage(&self, name: &str) {
        log::info!("[{}] === {name} ===", self.run_id);
    }

    fn locations_found(&self, count: usize) {
        log::info!("[{}] found {count} locations", self.run_id);
    }

    fn location_collected(&self, name: &str, listings: usize) {
        log::info!("[{}] ✅ {listings} listings from {name}", self.run_id);
    }

    fn location_skipped(&self, name: &str, reason: &str) {
        log::warn!("[{}] ⚠️ skipping {name}: {reason}", self.run_id);
    }

    fn worker_started(&self, worker: usize) {
        log::debug!("[{}] worker {worker} started", self.run_id);
    }

    fn worker_finished(&self, worker: usize, handled: usize) {
        log::debug!("[{}] worker {worker} finished after {handled} tasks", self.run_id);
    }

    fn detail_attempt_failed(&self, url_key: &str, attempt: u32, max: u32, err: &ScraperError) {
        log::warn!(
            "[{}] attempt {attempt}/{max} failed for {url_key}: {err}. Retrying...",
            self.run_id
        );
    }

    fn detail_finished(&self, worker: usize, result: &DetailResult) {
        match &result.error {
            None => log::info!(
                "[{}] [worker {worker}] {}: {} beds, {} baths, {} guests",
                self.run_id,
                result.url_key,
                result.bedrooms,
                result.bathrooms,
                result.guests
            ),
            Some(e) => log::error!(
                "[{}] [worker {worker}] ❌ {} failed after {} attempts: {e}",
                self.run_id,
                result.url_key,
                result.attempts
            ),
        }
    }

    fn summary(&self, s: &RunSummary) {
        log::info!(
            "[{}] locations {}/{} collected ({} skipped), {} listings, {} unique urls, details {} ok / {} failed{} in {:?}",
            s.run_id,
            s.locations_collected,
            s.locations_found,
            s.locations_skipped,
            s.listings_collected,
            s.unique_urls,
            s.details_succeeded,
            s.details_failed,
            if s.enrichment_skipped { " (enrichment skipped)" } else { "" },
            s.elapsed
        );
    }
}
