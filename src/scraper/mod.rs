pub mod models;
mod http_renderer;
mod scraper_error;
mod session;

pub use http_renderer::HttpRenderer;
pub use scraper_error::ScraperError;
pub use session::{with_session, Renderer, Session};
