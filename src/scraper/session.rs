// session.rs
use crate::scraper::models::{DetailFields, Location, RawListing};
use crate::scraper::ScraperError;
use std::time::{Duration, Instant};

/// One isolated browsing session. Nothing (cookies, connections, page state)
/// is shared between two sessions, so sessions can run side by side.
pub trait Session {
    fn discover_locations(&mut self, base_url: &str) -> Result<Vec<Location>, ScraperError>;

    fn fetch_listings(&mut self, location_url: &str) -> Result<Vec<RawListing>, ScraperError>;

    fn fetch_detail(&mut self, url: &str) -> Result<DetailFields, ScraperError>;

    /// Release whatever the session holds. Called exactly once.
    fn close(&mut self) {}
}

/// Something that can open sessions. Shared by reference across pool workers.
pub trait Renderer: Sync {
    type Session: Session;

    fn open_session(&self, timeout: Duration) -> Result<Self::Session, ScraperError>;
}

/// Owns an open session and closes it when dropped, including on early
/// return and unwinding.
pub struct SessionGuard<S: Session> {
    session: Option<S>,
    opened_at: Instant,
    timeout: Duration,
}

impl<S: Session> SessionGuard<S> {
    pub fn new(session: S, timeout: Duration) -> Self {
        Self {
            session: Some(session),
            opened_at: Instant::now(),
            timeout,
        }
    }

    pub fn session(&mut self) -> Result<&mut S, ScraperError> {
        self.session
            .as_mut()
            .ok_or_else(|| ScraperError::Config("session already closed".into()))
    }

    pub fn expired(&self) -> bool {
        self.opened_at.elapsed() > self.timeout
    }

    pub fn close(&mut self) {
        if let Some(mut s) = self.session.take() {
            s.close();
        }
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Run `op` inside a fresh session bounded by `timeout`.
///
/// The session is torn down before this returns, whatever the outcome. An
/// operation that finishes past its deadline is reported as a timeout and its
/// result is discarded.
pub fn with_session<R, T, F>(renderer: &R, timeout: Duration, op: F) -> Result<T, ScraperError>
where
    R: Renderer,
    F: FnOnce(&mut R::Session) -> Result<T, ScraperError>,
{
    let session = renderer.open_session(timeout)?;
    let mut guard = SessionGuard::new(session, timeout);

    let result = op(guard.session()?);
    let expired = guard.expired();
    guard.close();

    if expired {
        log::debug!("session exceeded {timeout:?}, discarding result");
        return Err(ScraperError::Timeout(timeout));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::{FakeRenderer, FakeStep};
    use std::sync::atomic::Ordering;

    #[test]
    fn session_is_closed_after_success() {
        let renderer = FakeRenderer::new().with_detail("https://x.test/rooms/1", vec![FakeStep::ok(2, 1.5, 4)]);

        let fields = with_session(&renderer, Duration::from_secs(5), |s| {
            s.fetch_detail("https://x.test/rooms/1")
        })
        .unwrap();

        assert_eq!(fields.bathrooms, 1.5);
        assert_eq!(renderer.opened.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn session_is_closed_after_failure() {
        let renderer = FakeRenderer::new();

        let err = with_session(&renderer, Duration::from_secs(5), |s| {
            s.fetch_detail("https://x.test/rooms/unknown")
        })
        .unwrap_err();

        assert!(matches!(err, ScraperError::MissingContent(_)));
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_result_counts_as_timeout() {
        let renderer = FakeRenderer::new().with_detail(
            "https://x.test/rooms/slow",
            vec![FakeStep::ok(1, 1.0, 2).after(Duration::from_millis(30))],
        );

        let err = with_session(&renderer, Duration::from_millis(5), |s| {
            s.fetch_detail("https://x.test/rooms/slow")
        })
        .unwrap_err();

        assert_eq!(err, ScraperError::Timeout(Duration::from_millis(5)));
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_open_leaves_nothing_to_close() {
        let renderer = FakeRenderer::new().failing_open();

        let err = with_session(&renderer, Duration::from_secs(1), |s| s.fetch_detail("u")).unwrap_err();

        assert!(matches!(err, ScraperError::Network(_)));
        assert_eq!(renderer.closed.load(Ordering::SeqCst), 0);
    }
}
