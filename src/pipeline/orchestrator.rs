// orchestrator.rs
use crate::config::{within, ScraperConfig};
use crate::domain::NormalizedListing;
use crate::errors::HarvestError;
use crate::pipeline::merge::{merge, unique_url_keys};
use crate::pipeline::pool::DetailPool;
use crate::pipeline::report::{RunReporter, RunSummary};
use crate::pipeline::retry::{RetryPolicy, Sleeper};
use crate::scraper::models::{Location, RawListing};
use crate::scraper::{with_session, Renderer, Session};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct HarvestOutcome {
    pub records: Vec<NormalizedListing>,
    pub summary: RunSummary,
}

impl HarvestOutcome {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn new_run_id() -> String {
    chrono::Utc::now().format("run-%Y%m%dT%H%M%S").to_string()
}

/// Drives discovery -> collection -> detail enrichment -> merge.
///
/// Only configuration problems and a failed or empty discovery end the run.
/// Everything after that degrades to fewer or thinner records.
pub struct Orchestrator<'a, R: Renderer> {
    run_id: String,
    renderer: &'a R,
    config: &'a ScraperConfig,
    reporter: &'a dyn RunReporter,
    sleeper: &'a dyn Sleeper,
    run_timeout: Duration,
}

impl<'a, R: Renderer> Orchestrator<'a, R> {
    pub fn new(
        run_id: impl Into<String>,
        renderer: &'a R,
        config: &'a ScraperConfig,
        reporter: &'a dyn RunReporter,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            renderer,
            config,
            reporter,
            sleeper,
            run_timeout: config.run_timeout(),
        }
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    // Session budgets follow `run_timeout`, which may be shorter than the
    // configured one.
    fn fetch_timeout(&self) -> Duration {
        within(self.config.fetch_timeout(), self.run_timeout)
    }

    fn collection_timeout(&self) -> Duration {
        within(self.config.collection_timeout(), self.run_timeout)
    }

    pub fn run(&self) -> Result<HarvestOutcome, HarvestError> {
        let started = Instant::now();
        let deadline = started + self.run_timeout;
        let mut summary = RunSummary {
            run_id: self.run_id.clone(),
            ..Default::default()
        };

        if self.config.base_url.trim().is_empty() {
            return Err(HarvestError::Config("scraper.base_url is required".into()));
        }

        self.reporter.stage("STEP 1: DISCOVERING LOCATIONS");
        let locations = self.discover()?;
        summary.locations_found = locations.len();
        self.reporter.locations_found(locations.len());

        self.reporter.stage("STEP 2: COLLECTING LISTINGS");
        let listings = self.collect(&locations, deadline, &mut summary);
        summary.listings_collected = listings.len();

        self.reporter.stage("STEP 3: DETAIL ENRICHMENT");
        let keys = unique_url_keys(&listings);
        summary.unique_urls = keys.len();

        let details = if Instant::now() >= deadline {
            log::warn!("run timeout reached, skipping detail enrichment for {} urls", keys.len());
            summary.enrichment_skipped = true;
            HashMap::new()
        } else {
            let pool = DetailPool::new(
                self.renderer,
                self.config.worker_count(),
                RetryPolicy::new(self.config.attempt_limit(), self.config.retry_delay()),
                self.fetch_timeout(),
                self.sleeper,
                self.reporter,
            );
            log::info!("enriching {} urls with {} workers", keys.len(), pool.workers());
            pool.fetch_all(&keys)
        };
        summary.details_succeeded = details.values().filter(|d| d.is_success()).count();
        summary.details_failed = details.len() - summary.details_succeeded;

        self.reporter.stage("STEP 4: MERGING");
        let records = merge(&listings, &details);

        summary.elapsed = started.elapsed();
        self.reporter.summary(&summary);

        Ok(HarvestOutcome { records, summary })
    }

    fn discover(&self) -> Result<Vec<Location>, HarvestError> {
        let base = self.config.base_url.trim();
        let locations = with_session(self.renderer, self.fetch_timeout(), |s| {
            s.discover_locations(base)
        })
        .map_err(HarvestError::Discovery)?;

        if locations.is_empty() {
            return Err(HarvestError::DiscoveryEmpty(base.to_string()));
        }
        Ok(locations)
    }

    fn collect(
        &self,
        locations: &[Location],
        deadline: Instant,
        summary: &mut RunSummary,
    ) -> Vec<RawListing> {
        // one session covers every results page of a location
        let timeout = self.collection_timeout();
        let mut all = Vec::new();

        for (i, location) in locations.iter().enumerate() {
            log::info!("[{}/{}] collecting {}", i + 1, locations.len(), location.name);

            if Instant::now() >= deadline {
                self.reporter.location_skipped(&location.name, "run timeout reached");
                summary.locations_skipped += 1;
                continue;
            }

            match with_session(self.renderer, timeout, |s| s.fetch_listings(&location.url)) {
                Ok(found) if found.is_empty() => {
                    self.reporter.location_skipped(&location.name, "no listings found");
                    summary.locations_skipped += 1;
                }
                Ok(found) => {
                    self.reporter.location_collected(&location.name, found.len());
                    summary.locations_collected += 1;
                    all.extend(found.into_iter().map(|mut l| {
                        l.location_name = location.name.clone();
                        l
                    }));
                }
                Err(e) => {
                    self.reporter.location_skipped(&location.name, &e.to_string());
                    summary.locations_skipped += 1;
                }
            }
        }

        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::ScraperError;
    use crate::tests::fakes::{card, loc, FakeRenderer, FakeStep, RecordingReporter, RecordingSleeper};

    fn config() -> ScraperConfig {
        ScraperConfig {
            base_url: "https://x.test".into(),
            retry_delay_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn failed_location_is_skipped_not_fatal() {
        let renderer = FakeRenderer::new()
            .with_locations(vec![loc("CityA", "u1"), loc("CityB", "u2")])
            .with_listings("u1", vec![card("https://x.test/rooms/1"), card("https://x.test/rooms/2")])
            .with_listings_error("u2", ScraperError::Network("502".into()));
        let cfg = config();
        let reporter = RecordingReporter::default();
        let sleeper = RecordingSleeper::default();

        let outcome = Orchestrator::new("t", &renderer, &cfg, &reporter, &sleeper).run().unwrap();

        assert_eq!(outcome.record_count(), 2);
        assert_eq!(outcome.summary.locations_found, 2);
        assert_eq!(outcome.summary.locations_collected, 1);
        assert_eq!(outcome.summary.locations_skipped, 1);
        assert_eq!(reporter.skipped(), vec!["CityB".to_string()]);
        assert!(outcome.records.iter().all(|r| r.location_name == "CityA"));
    }

    #[test]
    fn empty_location_counts_as_skipped() {
        let renderer = FakeRenderer::new()
            .with_locations(vec![loc("CityA", "u1"), loc("Ghost", "u3")])
            .with_listings("u1", vec![card("https://x.test/rooms/1")]);
        let cfg = config();
        let reporter = RecordingReporter::default();
        let sleeper = RecordingSleeper::default();

        let outcome = Orchestrator::new("t", &renderer, &cfg, &reporter, &sleeper).run().unwrap();

        assert_eq!(outcome.record_count(), 1);
        assert_eq!(reporter.skipped(), vec!["Ghost".to_string()]);
    }

    #[test]
    fn empty_discovery_aborts() {
        let renderer = FakeRenderer::new();
        let cfg = config();
        let reporter = RecordingReporter::default();
        let sleeper = RecordingSleeper::default();

        let err = Orchestrator::new("t", &renderer, &cfg, &reporter, &sleeper).run().err().unwrap();

        assert!(matches!(err, HarvestError::DiscoveryEmpty(_)));
    }

    #[test]
    fn discovery_error_aborts() {
        let renderer = FakeRenderer::new().with_discovery_error(ScraperError::Blocked("captcha".into()));
        let cfg = config();
        let reporter = RecordingReporter::default();
        let sleeper = RecordingSleeper::default();

        let err = Orchestrator::new("t", &renderer, &cfg, &reporter, &sleeper).run().err().unwrap();

        assert!(matches!(err, HarvestError::Discovery(ScraperError::Blocked(_))));
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        let renderer = FakeRenderer::new().with_locations(vec![loc("CityA", "u1")]);
        let cfg = ScraperConfig::default();
        let reporter = RecordingReporter::default();
        let sleeper = RecordingSleeper::default();

        let err = Orchestrator::new("t", &renderer, &cfg, &reporter, &sleeper).run().err().unwrap();

        assert!(matches!(err, HarvestError::Config(_)));
    }

    #[test]
    fn details_are_fetched_once_per_key_and_merged() {
        let renderer = FakeRenderer::new()
            .with_locations(vec![loc("CityA", "u1"), loc("CityB", "u2")])
            .with_listings("u1", vec![card("https://x.test/rooms/1"), card("https://x.test/rooms/2")])
            .with_listings("u2", vec![card("https://x.test/rooms/1?adults=2")])
            .with_detail("https://x.test/rooms/1", vec![FakeStep::ok(2, 1.5, 4)])
            .with_detail("https://x.test/rooms/2", vec![FakeStep::err("overview missing")]);
        let cfg = config();
        let reporter = RecordingReporter::default();
        let sleeper = RecordingSleeper::default();

        let outcome = Orchestrator::new("t", &renderer, &cfg, &reporter, &sleeper).run().unwrap();

        assert_eq!(outcome.record_count(), 3);
        assert_eq!(outcome.summary.unique_urls, 2);
        assert_eq!(outcome.summary.details_succeeded, 1);
        assert_eq!(outcome.summary.details_failed, 1);
        assert_eq!(renderer.detail_calls("https://x.test/rooms/1"), 1);
        assert_eq!(renderer.detail_calls("https://x.test/rooms/2"), 3);

        let beds: Vec<_> = outcome.records.iter().map(|r| (r.bedrooms, r.bathrooms)).collect();
        assert_eq!(beds, vec![(2, 1.5), (0, 0.0), (2, 1.5)]);
        assert_eq!(reporter.summaries(), 1);
    }

    #[test]
    fn run_timeout_is_honored_at_stage_boundaries() {
        let renderer = FakeRenderer::new()
            .with_locations(vec![loc("CityA", "u1"), loc("CityB", "u2"), loc("CityC", "u3")])
            .with_slow_listings("u1", vec![card("https://x.test/rooms/1")], Duration::from_millis(70))
            .with_slow_listings("u2", vec![card("https://x.test/rooms/2")], Duration::from_millis(70))
            .with_listings("u3", vec![card("https://x.test/rooms/3")])
            .with_detail("https://x.test/rooms/1", vec![FakeStep::ok(2, 1.0, 3)]);
        let cfg = config();
        let reporter = RecordingReporter::default();
        let sleeper = RecordingSleeper::default();

        let outcome = Orchestrator::new("t", &renderer, &cfg, &reporter, &sleeper)
            .with_run_timeout(Duration::from_millis(100))
            .run()
            .unwrap();

        // CityB started before the deadline and is kept, CityC is not started
        assert_eq!(outcome.record_count(), 2);
        assert_eq!(reporter.skipped(), vec!["CityC".to_string()]);
        assert!(outcome.summary.enrichment_skipped);
        assert_eq!(renderer.detail_calls("https://x.test/rooms/1"), 0);
        assert_eq!(outcome.records[0].bedrooms, 0);
    }

    #[test]
    fn shorter_run_timeout_also_bounds_sessions() {
        let renderer = FakeRenderer::new()
            .with_locations(vec![loc("CityA", "u1")])
            .with_slow_listings("u1", vec![card("https://x.test/rooms/1")], Duration::from_millis(190));
        let cfg = config();
        let reporter = RecordingReporter::default();
        let sleeper = RecordingSleeper::default();

        let outcome = Orchestrator::new("t", &renderer, &cfg, &reporter, &sleeper)
            .with_run_timeout(Duration::from_millis(200))
            .run()
            .unwrap();

        assert!(outcome.is_empty());
        assert_eq!(outcome.summary.locations_collected, 0);
        assert_eq!(reporter.skipped(), vec!["CityA".to_string()]);
    }

    #[test]
    fn paced_pages_fit_the_collection_budget() {
        // two pages of one second each plus 1.2s pacing; the session takes
        // longer than the bare per-page budget
        let renderer = FakeRenderer::new()
            .with_locations(vec![loc("CityA", "u1")])
            .with_slow_listings(
                "u1",
                vec![card("https://x.test/rooms/1"), card("https://x.test/rooms/2")],
                Duration::from_millis(2100),
            );
        let cfg = ScraperConfig {
            max_pages: 2,
            fetch_timeout_seconds: 1,
            delay_min_ms: 1200,
            delay_max_ms: 1200,
            ..config()
        };
        let reporter = RecordingReporter::default();
        let sleeper = RecordingSleeper::default();

        let outcome = Orchestrator::new("t", &renderer, &cfg, &reporter, &sleeper).run().unwrap();

        assert_eq!(outcome.record_count(), 2);
        assert_eq!(outcome.summary.locations_collected, 1);
        assert!(reporter.skipped().is_empty());
    }

    #[test]
    fn all_locations_failing_gives_an_empty_outcome() {
        let renderer = FakeRenderer::new()
            .with_locations(vec![loc("CityA", "u1")])
            .with_listings_error("u1", ScraperError::Blocked("HTTP 429".into()));
        let cfg = config();
        let reporter = RecordingReporter::default();
        let sleeper = RecordingSleeper::default();

        let outcome = Orchestrator::new("t", &renderer, &cfg, &reporter, &sleeper).run().unwrap();

        assert!(outcome.is_empty());
        assert_eq!(outcome.summary.locations_skipped, 1);
    }
}
