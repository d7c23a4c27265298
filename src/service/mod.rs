//! Crawl service module
//!
//! This module exposes the HTTP API:
//! - `GET /health` liveness check
//! - `POST /crawl` asynchronous crawl returning a task id
//! - `POST /crawl_sync` and `POST /crawl_direct` immediate-result crawls
//! - `GET /task/{task_id}` task status
//!
//! Crawls dispatched for a task run on their own tokio task, so they finish
//! and record their outcome even if the submitting connection goes away.

mod auth;
mod error;
mod routes;

pub use auth::{parse_bearer, token_digest};
pub use error::ServiceError;
pub use routes::{
    outcome_to_response, outcome_to_task, CrawlMetadata, CrawlResponse, TaskAccepted,
};

use crate::engine::{CrawlEngine, EngineOutcome, RunConfig};
use crate::storage::TaskStore;
use axum::routing::{get, post};
use axum::{middleware, Router};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use url::Url;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    engine: Arc<dyn CrawlEngine>,
    store: Arc<dyn TaskStore>,
    run_config: Arc<RunConfig>,
    permits: Arc<Semaphore>,
    token_digest: Option<String>,
}

impl AppState {
    /// Creates the service state
    ///
    /// # Arguments
    ///
    /// * `engine` - The crawl engine every request is delegated to
    /// * `store` - Task store for the asynchronous endpoints
    /// * `run_config` - Fixed run settings passed to the engine
    /// * `max_concurrent_crawls` - Upper bound on simultaneous engine runs
    /// * `token` - Bearer token clients must present; `None` disables auth
    pub fn new(
        engine: Arc<dyn CrawlEngine>,
        store: Arc<dyn TaskStore>,
        run_config: RunConfig,
        max_concurrent_crawls: usize,
        token: Option<String>,
    ) -> Self {
        Self {
            engine,
            store,
            run_config: Arc::new(run_config),
            permits: Arc::new(Semaphore::new(max_concurrent_crawls.max(1))),
            token_digest: token.as_deref().map(token_digest),
        }
    }

    /// The task store shared with the handlers, for background maintenance
    pub fn store(&self) -> Arc<dyn TaskStore> {
        Arc::clone(&self.store)
    }

    /// Runs the engine once, waiting for a free slot first
    pub async fn execute(&self, url: &Url) -> EngineOutcome {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return EngineOutcome::Transport("Crawl engine is shutting down".to_string()),
        };

        tracing::debug!("Engine run starting for {}", url);
        self.engine.crawl(url, &self.run_config).await
    }

    /// Spawns the engine run for `task_id` and records its outcome
    ///
    /// The returned handle yields the raw outcome for callers that wait;
    /// dropping it leaves the run going in the background. An engine run
    /// that panics is recorded as a failed task.
    pub fn dispatch(&self, task_id: String, url: Url) -> JoinHandle<EngineOutcome> {
        let state = self.clone();
        tokio::spawn(async move {
            // Inner task so a panicking engine still leaves a terminal record
            let run = {
                let state = state.clone();
                tokio::spawn(async move { state.execute(&url).await })
            };
            let outcome = match run.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Crawl task {} aborted: {}", task_id, e);
                    EngineOutcome::Transport(format!("Crawl task aborted: {}", e))
                }
            };
            tracing::info!(
                "Crawl {} completed. Success: {}",
                task_id,
                outcome.is_success()
            );

            if let Err(e) = state.store.update(&task_id, outcome_to_task(outcome.clone())) {
                tracing::error!("Failed to record outcome of task {}: {}", task_id, e);
            }
            outcome
        })
    }
}

/// Builds the service router
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/crawl", post(routes::crawl_async))
        .route("/crawl_sync", post(routes::crawl_sync))
        .route("/crawl_direct", post(routes::crawl_direct))
        .route("/task/:task_id", get(routes::get_task))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
        .with_state(state)
}

/// Periodically evicts expired tasks from `store`
pub fn spawn_sweeper(store: Arc<dyn TaskStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.evict_expired(Utc::now()) {
                Ok(0) => {}
                Ok(count) => tracing::info!(
                    "Evicted {} expired tasks ({} remaining)",
                    count,
                    store.len()
                ),
                Err(e) => tracing::error!("Task eviction failed: {}", e),
            }
        }
    })
}

/// Serves `router` on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Crawl service listening on {}", addr);
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
