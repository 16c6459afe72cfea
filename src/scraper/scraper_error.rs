use thiserror::Error;

/// Failures raised while rendering or extracting a single page.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScraperError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Blocked by site: {0}")]
    Blocked(String),
    #[error("HTML parse error: {0}")]
    HtmlParse(String),
    #[error("Expected content missing: {0}")]
    MissingContent(String),
    #[error("Renderer config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ScraperError {
    fn from(e: reqwest::Error) -> Self {
        ScraperError::Network(e.to_string())
    }
}
