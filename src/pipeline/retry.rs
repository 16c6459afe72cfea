// retry.rs
use crate::pipeline::report::RunReporter;
use crate::scraper::models::{DetailFields, DetailResult};
use crate::scraper::ScraperError;
use std::time::Duration;

/// Fixed attempt count, fixed delay. No backoff: request timing is already
/// jittered by the renderer's pacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_MAX_RETRIES,
            delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Waits between attempts. Swapped for a fake clock in tests.
pub trait Sleeper: Sync {
    fn sleep(&self, d: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Pending,
    Attempting(u32),
    Done(DetailResult),
}

impl TaskState {
    /// Advance one step. `attempt` is only invoked when entering `Attempting`.
    fn step<F>(
        self,
        url_key: &str,
        policy: &RetryPolicy,
        sleeper: &dyn Sleeper,
        reporter: &dyn RunReporter,
        attempt: &mut F,
    ) -> TaskState
    where
        F: FnMut(u32) -> Result<DetailFields, ScraperError>,
    {
        match self {
            TaskState::Pending => TaskState::Attempting(1),
            TaskState::Attempting(i) => match attempt(i) {
                Ok(fields) => TaskState::Done(DetailResult::success(url_key, fields, i)),
                Err(e) if i < policy.max_attempts => {
                    reporter.detail_attempt_failed(url_key, i, policy.max_attempts, &e);
                    sleeper.sleep(policy.delay);
                    TaskState::Attempting(i + 1)
                }
                Err(e) => TaskState::Done(DetailResult::failure(url_key, e, i)),
            },
            done @ TaskState::Done(_) => done,
        }
    }
}

/// Drive one task from `Pending` to `Done`. Failure is recorded in the
/// result, never returned as an error.
pub fn run_task<F>(
    url_key: &str,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    reporter: &dyn RunReporter,
    mut attempt: F,
) -> DetailResult
where
    F: FnMut(u32) -> Result<DetailFields, ScraperError>,
{
    let mut state = TaskState::Pending;
    loop {
        state = state.step(url_key, policy, sleeper, reporter, &mut attempt);
        if let TaskState::Done(result) = state {
            return result;
        }
    }
}
