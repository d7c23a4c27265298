//! Scripted crawl engine, built for tests and the `test-util` feature

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{CrawlEngine, CrawlResult, EngineOutcome, RunConfig};

/// Scripted engine for tests: returns preset outcomes per URL
pub struct MockEngine {
    /// key: parsed URL string (e.g. `https://example.com/`) → value: outcome
    responses: Mutex<HashMap<String, EngineOutcome>>,
    default_outcome: EngineOutcome,
    delay: Duration,
    /// URLs crawled, in call order
    pub calls: Mutex<Vec<String>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            default_outcome: EngineOutcome::Success(CrawlResult::success("# Mock page", Some(200))),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome for URLs without a specific response
    pub fn with_default(mut self, outcome: EngineOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Simulated render time applied to every crawl
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the outcome for one URL
    pub fn set_response(&self, url: &str, outcome: EngineOutcome) {
        lock(&self.responses).insert(url.to_string(), outcome);
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

/// Locks `mutex`, recovering the data if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl CrawlEngine for MockEngine {
    async fn crawl(&self, url: &Url, _config: &RunConfig) -> EngineOutcome {
        lock(&self.calls).push(url.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        lock(&self.responses)
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| self.default_outcome.clone())
    }
}
