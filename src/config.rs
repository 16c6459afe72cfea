// config.rs
use crate::errors::HarvestError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MAX_WORKERS: usize = 3;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// `d` when it fits strictly inside `limit`, otherwise nine tenths of `limit`.
pub fn within(d: Duration, limit: Duration) -> Duration {
    if d < limit {
        d
    } else {
        limit * 9 / 10
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub database: DatabaseConfig,
    pub output: OutputConfig,
}

/// Knobs for discovery, collection and detail enrichment.
///
/// Counts are signed on purpose: `max_workers: 0` or `max_retries: -1` in the
/// YAML are accepted and fall back to the defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    pub max_pages: i64,
    pub properties_per_page: i64,
    pub max_workers: i64,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub max_retries: i64,
    pub retry_delay_ms: u64,
    pub headless: bool,
    pub timeout_seconds: u64,
    pub fetch_timeout_seconds: u64,
    pub user_agent: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            max_pages: 2,
            properties_per_page: 5,
            max_workers: DEFAULT_MAX_WORKERS as i64,
            delay_min_ms: 800,
            delay_max_ms: 2000,
            max_retries: DEFAULT_MAX_RETRIES as i64,
            retry_delay_ms: 2000,
            headless: true,
            timeout_seconds: 600,
            fetch_timeout_seconds: 30,
            user_agent: None,
        }
    }
}

impl ScraperConfig {
    pub fn worker_count(&self) -> usize {
        if self.max_workers <= 0 {
            DEFAULT_MAX_WORKERS
        } else {
            self.max_workers as usize
        }
    }

    pub fn attempt_limit(&self) -> u32 {
        if self.max_retries <= 0 {
            DEFAULT_MAX_RETRIES
        } else {
            self.max_retries as u32
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Per-fetch session timeout, always strictly inside the run timeout.
    pub fn fetch_timeout(&self) -> Duration {
        let run = self.run_timeout();
        let fetch = Duration::from_secs(self.fetch_timeout_seconds);
        if fetch.is_zero() || fetch >= run {
            run / 2
        } else {
            fetch
        }
    }

    /// Session budget for one location: a fetch per page plus the pacing
    /// between pages, kept inside the run timeout.
    pub fn collection_timeout(&self) -> Duration {
        let pages = self.pages() as u32;
        let (lo, hi) = self.delay_bounds();
        let pacing = Duration::from_millis(lo.max(hi)) * (pages - 1);
        within(self.fetch_timeout() * pages + pacing, self.run_timeout())
    }

    pub fn delay_bounds(&self) -> (u64, u64) {
        (self.delay_min_ms, self.delay_max_ms)
    }

    pub fn pages(&self) -> usize {
        self.max_pages.max(1) as usize
    }

    pub fn per_page(&self) -> usize {
        self.properties_per_page.max(1) as usize
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "listings.sqlite3".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_file: String,
    pub json_console: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_file: "listings.csv".into(),
            json_console: false,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HarvestError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            HarvestError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, HarvestError> {
        let mut cfg: Config = serde_yaml::from_str(text)
            .map_err(|e| HarvestError::Config(format!("failed to parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&mut self) -> Result<(), HarvestError> {
        let base = self.scraper.base_url.trim();
        if base.is_empty() {
            return Err(HarvestError::Config("scraper.base_url is required".into()));
        }

        let parsed = url::Url::parse(base)
            .map_err(|e| HarvestError::Config(format!("scraper.base_url is invalid: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HarvestError::Config(format!(
                "scraper.base_url must be http(s), got {}",
                parsed.scheme()
            )));
        }
        self.scraper.base_url = base.to_string();

        if self.scraper.delay_min_ms > self.scraper.delay_max_ms {
            std::mem::swap(&mut self.scraper.delay_min_ms, &mut self.scraper.delay_max_ms);
        }

        if self.database.path.trim().is_empty() {
            return Err(HarvestError::Config("database.path must not be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = Config::from_yaml("scraper:\n  base_url: https://www.airbnb.com\n").unwrap();

        assert_eq!(cfg.scraper.worker_count(), 3);
        assert_eq!(cfg.scraper.attempt_limit(), 3);
        assert_eq!(cfg.scraper.pages(), 2);
        assert_eq!(cfg.scraper.per_page(), 5);
        assert_eq!(cfg.database.path, "listings.sqlite3");
        assert_eq!(cfg.output.csv_file, "listings.csv");
        assert!(cfg.scraper.headless);
    }

    #[test]
    fn missing_base_url_is_fatal() {
        let err = Config::from_yaml("scraper:\n  max_workers: 4\n").unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = Config::from_yaml("scraper:\n  base_url: ftp://example.com\n").unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn non_positive_pool_and_retries_fall_back() {
        let yaml = r#"
scraper:
  base_url: https://example.com
  max_workers: 0
  max_retries: -2
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.scraper.worker_count(), DEFAULT_MAX_WORKERS);
        assert_eq!(cfg.scraper.attempt_limit(), DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn fetch_timeout_stays_inside_run_timeout() {
        let yaml = r#"
scraper:
  base_url: https://example.com
  timeout_seconds: 20
  fetch_timeout_seconds: 45
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.scraper.fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn collection_budget_counts_pacing_between_pages() {
        let cfg = ScraperConfig {
            base_url: "https://example.com".into(),
            max_pages: 2,
            fetch_timeout_seconds: 1,
            delay_min_ms: 2500,
            delay_max_ms: 2500,
            ..Default::default()
        };
        assert_eq!(cfg.collection_timeout(), Duration::from_millis(4500));

        let single = ScraperConfig {
            max_pages: 1,
            ..cfg
        };
        assert_eq!(single.collection_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn collection_budget_stays_inside_run_timeout() {
        let cfg = ScraperConfig {
            base_url: "https://example.com".into(),
            max_pages: 5,
            timeout_seconds: 60,
            fetch_timeout_seconds: 30,
            ..Default::default()
        };
        assert!(cfg.collection_timeout() < cfg.run_timeout());
        assert_eq!(cfg.collection_timeout(), Duration::from_secs(54));
    }

    #[test]
    fn within_keeps_short_budgets() {
        assert_eq!(within(Duration::from_secs(3), Duration::from_secs(10)), Duration::from_secs(3));
        assert_eq!(within(Duration::from_secs(10), Duration::from_secs(10)), Duration::from_secs(9));
    }

    #[test]
    fn inverted_delay_bounds_are_swapped() {
        let yaml = r#"
scraper:
  base_url: https://example.com
  delay_min_ms: 3000
  delay_max_ms: 1000
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.scraper.delay_bounds(), (1000, 3000));
    }
}
