// http_renderer.rs
use crate::config::ScraperConfig;
use crate::domain::normalize::{clean_text, extract_decimal, extract_number};
use crate::pipeline::canonical::canonical_key;
use crate::scraper::models::{DetailFields, Location, RawListing};
use crate::scraper::{Renderer, ScraperError, Session};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER};
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const CARD: &str = r#"[data-testid="card-container"]"#;
const CARD_LINK: &str = r#"a[href*="/rooms/"]"#;
const CARD_TITLE: &str = r#"[data-testid="listing-card-title"]"#;
const CARD_PRICE: &str = r#"[data-testid="price-availability-row"]"#;
const CARD_RATING: &str = r#"[aria-label*="rating"]"#;
const NEXT_PAGE: &str = r#"a[aria-label="Next"]"#;
const OVERVIEW: &str = r#"[data-section-id="OVERVIEW_DEFAULT"]"#;

static BEDROOMS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(bedroom|bed)").unwrap());
static BATHS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+\.?\d*)\s*(shared |private )?bath").unwrap());
static GUESTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*guest").unwrap());

/// Renderer that fetches pages over plain HTTP and reads them with CSS
/// selectors. Every session gets its own client.
pub struct HttpRenderer {
    user_agent: String,
    max_pages: usize,
    per_page: usize,
    delay_ms: (u64, u64),
}

impl HttpRenderer {
    pub fn new(cfg: &ScraperConfig) -> Self {
        if !cfg.headless {
            log::warn!("headless: false has no effect, the HTTP renderer never opens a window");
        }

        Self {
            user_agent: cfg.user_agent.clone().unwrap_or_else(|| USER_AGENT.to_string()),
            max_pages: cfg.pages(),
            per_page: cfg.per_page(),
            delay_ms: cfg.delay_bounds(),
        }
    }
}

impl Renderer for HttpRenderer {
    type Session = HttpSession;

    fn open_session(&self, timeout: Duration) -> Result<HttpSession, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(self.user_agent.as_str())
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(HttpSession {
            client: Some(client),
            timeout,
            max_pages: self.max_pages,
            per_page: self.per_page,
            delay_ms: self.delay_ms,
        })
    }
}

pub struct HttpSession {
    client: Option<Client>,
    timeout: Duration,
    max_pages: usize,
    per_page: usize,
    delay_ms: (u64, u64),
}

impl HttpSession {
    fn get_html(&self, url: &str) -> Result<String, ScraperError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ScraperError::Config("session is closed".into()))?;

        let resp = client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                ScraperError::Timeout(self.timeout)
            } else {
                ScraperError::Network(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ScraperError::Blocked(format!("HTTP {status} for {url}")));
        }
        if !status.is_success() {
            return Err(ScraperError::Network(format!("HTTP {status} for {url}")));
        }

        resp.text().map_err(|e| ScraperError::Network(e.to_string()))
    }

    /// Human-ish pause between page actions.
    fn pause(&self) {
        let (min, max) = self.delay_ms;
        let ms = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        log::debug!("waiting {ms}ms before next page");
        std::thread::sleep(Duration::from_millis(ms));
    }
}

impl Session for HttpSession {
    fn discover_locations(&mut self, base_url: &str) -> Result<Vec<Location>, ScraperError> {
        let html = self.get_html(base_url)?;
        parse_locations(&html, base_url)
    }

    fn fetch_listings(&mut self, location_url: &str) -> Result<Vec<RawListing>, ScraperError> {
        paginate(
            location_url,
            self.max_pages,
            self.per_page,
            |url| self.get_html(url),
            || self.pause(),
        )
    }

    fn fetch_detail(&mut self, url: &str) -> Result<DetailFields, ScraperError> {
        log::debug!("detail page: {url}");
        let html = self.get_html(url)?;
        parse_detail(&html)
    }

    fn close(&mut self) {
        // dropping the client shuts its connection pool
        self.client.take();
    }
}

/// Walk results pages from `start_url` along the Next link.
///
/// Stops at `max_pages`, on a page seen before, on a page without cards or
/// when there is no Next link. A failure after the first page keeps what the
/// earlier pages produced.
pub(crate) fn paginate<F, P>(
    start_url: &str,
    max_pages: usize,
    per_page: usize,
    mut fetch_page: F,
    mut pause: P,
) -> Result<Vec<RawListing>, ScraperError>
where
    F: FnMut(&str) -> Result<String, ScraperError>,
    P: FnMut(),
{
    let mut page_url = start_url.to_string();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for page in 1..=max_pages {
        if !seen.insert(canonical_key(&page_url)) {
            log::debug!("page {page} already seen, stopping");
            break;
        }

        log::info!("📄 page {page}: {page_url}");
        let html = match fetch_page(&page_url) {
            Ok(html) => html,
            Err(e) if page > 1 => {
                log::warn!("page {page} failed, keeping {} listings: {e}", out.len());
                break;
            }
            Err(e) => return Err(e),
        };

        let (cards, next) = parse_listing_page(&html, &page_url, per_page)?;
        if cards.is_empty() {
            log::debug!("page {page} has no listing cards, stopping");
            break;
        }
        out.extend(cards);

        match next {
            Some(next) if page < max_pages => {
                page_url = next;
                pause();
            }
            _ => break,
        }
    }

    Ok(out)
}

fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::HtmlParse(e.to_string()))
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    base.join(href.trim()).ok()
}

fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Search-result links on the entry page, one per distinct location.
pub(crate) fn parse_locations(html: &str, base_url: &str) -> Result<Vec<Location>, ScraperError> {
    let base = Url::parse(base_url).map_err(|e| ScraperError::Config(e.to_string()))?;
    let document = Html::parse_document(html);
    let links = selector("a[href]")?;

    let mut seen = HashSet::new();
    let mut locations = Vec::new();

    for a in document.select(&links) {
        let Some(url) = a.value().attr("href").and_then(|h| resolve(&base, h)) else {
            continue;
        };
        if !url.path().starts_with("/s/") {
            continue;
        }

        let mut name = element_text(a);
        if name.is_empty() {
            name = url
                .path_segments()
                .and_then(|mut s| s.nth(1))
                .map(|seg| seg.replace('-', " ").replace("%20", " "))
                .unwrap_or_default();
        }
        if name.is_empty() || !seen.insert(canonical_key(url.as_str())) {
            continue;
        }

        locations.push(Location {
            name,
            url: url.to_string(),
        });
    }

    Ok(locations)
}

/// Listing cards on one results page (at most `limit`) plus the next-page link.
pub(crate) fn parse_listing_page(
    html: &str,
    page_url: &str,
    limit: usize,
) -> Result<(Vec<RawListing>, Option<String>), ScraperError> {
    let base = Url::parse(page_url).map_err(|e| ScraperError::Config(e.to_string()))?;
    let document = Html::parse_document(html);

    let card_sel = selector(CARD)?;
    let link_sel = selector(CARD_LINK)?;
    let title_sel = selector(CARD_TITLE)?;
    let price_sel = selector(CARD_PRICE)?;
    let rating_sel = selector(CARD_RATING)?;

    let mut cards = Vec::new();
    for card in document.select(&card_sel) {
        if cards.len() >= limit {
            break;
        }

        let Some(url) = card
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|h| resolve(&base, h))
        else {
            continue;
        };

        let text_of = |sel: &Selector| card.select(sel).next().map(element_text).unwrap_or_default();

        let rating_text = card
            .select(&rating_sel)
            .next()
            .map(|el| {
                let text = element_text(el);
                if text.is_empty() {
                    el.value().attr("aria-label").unwrap_or_default().to_string()
                } else {
                    text
                }
            })
            .unwrap_or_default();

        cards.push(RawListing {
            url: url.to_string(),
            title: text_of(&title_sel),
            price_text: text_of(&price_sel),
            rating_text,
            ..Default::default()
        });
    }

    let next = document
        .select(&selector(NEXT_PAGE)?)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|h| resolve(&base, h))
        .map(|u| u.to_string());

    Ok((cards, next))
}

/// Bedrooms, bathrooms and guests from the detail page overview section.
pub(crate) fn parse_detail(html: &str) -> Result<DetailFields, ScraperError> {
    let document = Html::parse_document(html);
    let overview = document
        .select(&selector(OVERVIEW)?)
        .next()
        .ok_or_else(|| ScraperError::MissingContent("overview section".into()))?;

    let text = element_text(overview);
    let first = |re: &Regex| re.find(&text).map(|m| m.as_str().to_string()).unwrap_or_default();

    Ok(DetailFields {
        bedrooms: extract_number(&first(&*BEDROOMS_RE)),
        bathrooms: extract_decimal(&first(&*BATHS_RE)),
        guests: extract_number(&first(&*GUESTS_RE)),
    })
}
