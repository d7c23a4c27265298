//! Crawl client module
//!
//! Submits crawl requests to the service and, for asynchronous submissions,
//! polls the task endpoint until the task is terminal or the wait budget is
//! spent:
//!
//! ```text
//! Submitted -> Polling -> Completed | Failed | TimedOut
//! ```
//!
//! The bearer token is part of `ClientConfig`; a client cannot be built
//! without one, so a missing token fails before any request is sent.

mod endpoint;
mod output;
mod poller;

pub use endpoint::{base_url, is_local_host};
pub use output::{extract_markdown, write_markdown};
pub use poller::{deadline_after, poll_until, PollError, PollStep};

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::state::TaskStatus;
use crate::storage::{CrawlRequest, DEFAULT_PRIORITY};

/// Environment variable the binaries read the bearer token from
pub const TOKEN_ENV_VAR: &str = "CRAWL_API_TOKEN";

/// Default port of the crawl service
pub const DEFAULT_PORT: u16 = 11235;

/// Errors surfaced by the crawl client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Missing API token: set the CRAWL_API_TOKEN environment variable")]
    MissingToken,

    #[error("Could not connect to crawl service at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("Request to {endpoint} failed with HTTP {status}: {detail}")]
    Http {
        endpoint: String,
        status: u16,
        detail: String,
    },

    #[error("Crawl service is not healthy (HTTP {status})")]
    Unhealthy { status: u16 },

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Timed out after {}s waiting for task {task_id}", .waited.as_secs())]
    Timeout { task_id: String, waited: Duration },

    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Which endpoint a crawl is submitted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// `POST /crawl`, then poll `/task/{id}`
    Async,
    /// `POST /crawl_sync`
    Sync,
    /// `POST /crawl_direct`
    Direct,
}

impl Mode {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Async => "/crawl",
            Self::Sync => "/crawl_sync",
            Self::Direct => "/crawl_direct",
        }
    }
}

/// Client settings
#[derive(Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub mode: Mode,
    token: String,
    pub priority: i64,
    /// Delay between task status checks
    pub poll_interval: Duration,
    /// Maximum time from submission to a terminal task state
    pub max_wait: Duration,
    /// Poll returned task ids; when false the submission response is final
    pub wait: bool,
    /// Call `/health` before submitting
    pub health_check: bool,
    pub output_path: PathBuf,
    /// Timeout for each individual HTTP request
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Creates a config with default settings
    ///
    /// # Errors
    ///
    /// `ClientError::MissingToken` if `token` is absent or blank.
    pub fn new(host: impl Into<String>, port: u16, token: Option<String>) -> Result<Self, ClientError> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ClientError::MissingToken)?;

        Ok(Self {
            host: host.into(),
            port,
            mode: Mode::Sync,
            token,
            priority: DEFAULT_PRIORITY,
            poll_interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(60),
            wait: true,
            health_check: true,
            output_path: PathBuf::from("crawl_result.md"),
            request_timeout: Duration::from_secs(300),
        })
    }

    pub fn base_url(&self) -> String {
        base_url(&self.host, self.port)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("mode", &self.mode)
            .field("token", &"<redacted>")
            .field("priority", &self.priority)
            .field("poll_interval", &self.poll_interval)
            .field("max_wait", &self.max_wait)
            .field("wait", &self.wait)
            .field("health_check", &self.health_check)
            .field("output_path", &self.output_path)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// What a finished client run produced
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Final JSON payload: the crawl result, or the submission response
    /// when not waiting
    pub response: Value,
    /// Markdown written to disk, if any
    pub markdown: Option<String>,
    pub output_path: Option<PathBuf>,
}

/// HTTP client for the crawl service
pub struct CrawlClient {
    config: ClientConfig,
    http: Client,
    base_url: String,
}

impl CrawlClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(ClientError::ClientBuild)?;
        let base_url = config.base_url();

        Ok(Self {
            config,
            http,
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submits `url`, waits for the result if needed, and writes the markdown
    pub async fn run(&self, url: &str) -> Result<CrawlOutcome, ClientError> {
        if self.config.health_check {
            self.health_check().await?;
        }

        let submitted_at = Instant::now();
        let response = self.submit(url).await?;

        let task_id = response
            .get("task_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let payload = match task_id {
            Some(task_id) if self.config.wait => {
                tracing::info!("Task {} submitted, polling for completion", task_id);
                self.wait_for_task(&task_id, submitted_at).await?
            }
            Some(task_id) => {
                tracing::info!("Task {} submitted, not waiting", task_id);
                return Ok(CrawlOutcome {
                    response,
                    markdown: None,
                    output_path: None,
                });
            }
            None => response,
        };

        let markdown = extract_markdown(&payload);
        write_markdown(&self.config.output_path, &markdown)?;
        tracing::info!(
            "Wrote {} bytes of markdown to {}",
            markdown.len(),
            self.config.output_path.display()
        );

        Ok(CrawlOutcome {
            response: payload,
            markdown: Some(markdown),
            output_path: Some(self.config.output_path.clone()),
        })
    }

    /// Checks `GET /health`
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let endpoint = self.endpoint("/health");
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|source| ClientError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(ClientError::Unhealthy {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Posts a crawl request to the endpoint for the configured mode
    pub async fn submit(&self, url: &str) -> Result<Value, ClientError> {
        let endpoint = self.endpoint(self.config.mode.path());
        let request = CrawlRequest {
            url: url.to_string(),
            priority: self.config.priority,
        };

        tracing::debug!("Submitting {} to {}", url, endpoint);
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.config.token)
            .json(&request)
            .send()
            .await
            .map_err(|source| ClientError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                endpoint,
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ClientError::InvalidResponse {
                endpoint,
                message: e.to_string(),
            })
    }

    /// Polls `/task/{task_id}` until it is terminal or the wait budget,
    /// counted from `submitted_at`, runs out
    pub async fn wait_for_task(
        &self,
        task_id: &str,
        submitted_at: Instant,
    ) -> Result<Value, ClientError> {
        let endpoint = self.endpoint(&format!("/task/{}", task_id));
        let deadline = deadline_after(submitted_at, self.config.max_wait);

        poll_until(self.config.poll_interval, deadline, || {
            self.check_task(&endpoint, task_id)
        })
        .await
        .map_err(|e| match e {
            PollError::TimedOut { attempts } => {
                tracing::warn!("Task {} still not finished after {} checks", task_id, attempts);
                ClientError::Timeout {
                    task_id: task_id.to_string(),
                    waited: self.config.max_wait,
                }
            }
            PollError::Aborted(error) => error,
        })
    }

    /// One status check; transport errors and unexpected statuses are
    /// reported as `Pending` so the next interval retries
    async fn check_task(&self, endpoint: &str, task_id: &str) -> PollStep<Value, ClientError> {
        let response = match self
            .http
            .get(endpoint)
            .bearer_auth(&self.config.token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Status check for task {} failed: {}", task_id, e);
                return PollStep::Pending;
            }
        };

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return PollStep::Abort(ClientError::TaskNotFound(task_id.to_string()))
            }
            status => {
                tracing::warn!("Status check for task {} returned HTTP {}", task_id, status);
                return PollStep::Pending;
            }
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Unreadable status for task {}: {}", task_id, e);
                return PollStep::Pending;
            }
        };

        match body
            .get("status")
            .and_then(Value::as_str)
            .and_then(TaskStatus::parse)
        {
            Some(TaskStatus::Completed) => {
                tracing::info!("Task {} completed", task_id);
                PollStep::Ready(body.get("result").cloned().unwrap_or(Value::Null))
            }
            Some(TaskStatus::Failed) => {
                let error = body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                PollStep::Abort(ClientError::TaskFailed(error))
            }
            Some(TaskStatus::Pending) => {
                tracing::debug!("Task {} still pending", task_id);
                PollStep::Pending
            }
            None => {
                tracing::warn!("Task {} has unrecognised status: {}", task_id, body);
                PollStep::Pending
            }
        }
    }
}

/// Takes the `detail` field of a JSON error body, or the raw body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("detail").map(|detail| match detail {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }))
        .unwrap_or_else(|| body.trim().to_string())
}
