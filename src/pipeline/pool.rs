// pool.rs
use crate::config::DEFAULT_MAX_WORKERS;
use crate::pipeline::report::RunReporter;
use crate::pipeline::retry::{run_task, RetryPolicy, Sleeper};
use crate::scraper::models::DetailResult;
use crate::scraper::{with_session, Renderer, Session};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Bounded set of worker threads that enrich listings with detail-page data.
pub struct DetailPool<'a, R: Renderer> {
    renderer: &'a R,
    workers: usize,
    policy: RetryPolicy,
    fetch_timeout: Duration,
    sleeper: &'a dyn Sleeper,
    reporter: &'a dyn RunReporter,
}

impl<'a, R: Renderer> DetailPool<'a, R> {
    /// `workers == 0` means the default pool size.
    pub fn new(
        renderer: &'a R,
        workers: usize,
        policy: RetryPolicy,
        fetch_timeout: Duration,
        sleeper: &'a dyn Sleeper,
        reporter: &'a dyn RunReporter,
    ) -> Self {
        Self {
            renderer,
            workers: if workers == 0 { DEFAULT_MAX_WORKERS } else { workers },
            policy,
            fetch_timeout,
            sleeper,
            reporter,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fetch every key in `url_keys` and return one result per key.
    ///
    /// Blocks until every worker has exited, so the returned map has no
    /// writers left.
    pub fn fetch_all(&self, url_keys: &BTreeSet<String>) -> HashMap<String, DetailResult> {
        if url_keys.is_empty() {
            return HashMap::new();
        }

        let queue: Mutex<VecDeque<String>> = Mutex::new(url_keys.iter().cloned().collect());
        let results: Mutex<HashMap<String, DetailResult>> =
            Mutex::new(HashMap::with_capacity(url_keys.len()));

        let workers = self.workers.min(url_keys.len());
        log::info!("starting {workers} workers for {} detail pages", url_keys.len());

        thread::scope(|scope| {
            for id in 1..=workers {
                let queue = &queue;
                let results = &results;
                scope.spawn(move || self.work(id, queue, results));
            }
        });

        results.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn work(
        &self,
        id: usize,
        queue: &Mutex<VecDeque<String>>,
        results: &Mutex<HashMap<String, DetailResult>>,
    ) {
        self.reporter.worker_started(id);
        let mut handled = 0;

        loop {
            // lock released before the fetch starts
            let next = queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
            let Some(url_key) = next else { break };

            let result = run_task(&url_key, &self.policy, self.sleeper, self.reporter, |_| {
                with_session(self.renderer, self.fetch_timeout, |s| s.fetch_detail(&url_key))
            });
            self.reporter.detail_finished(id, &result);
            handled += 1;

            let mut map = results.lock().unwrap_or_else(PoisonError::into_inner);
            match map.entry(url_key) {
                Entry::Vacant(slot) => {
                    slot.insert(result);
                }
                Entry::Occupied(existing) => {
                    log::warn!("result for {} already recorded, keeping the first", existing.key());
                }
            }
        }

        self.reporter.worker_finished(id, handled);
    }
}
