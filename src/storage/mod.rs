//! Storage module for crawl task records
//!
//! This module holds the task records the asynchronous endpoints hand out
//! and the store that tracks them:
//! - Request and task record types (wire format of the task status route)
//! - The `TaskStore` trait
//! - An in-memory implementation with TTL retention

mod memory;
mod traits;

pub use memory::InMemoryTaskStore;
pub use traits::{StoreError, StoreResult, TaskStore};

use crate::state::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Priority assigned to requests that do not carry one
pub const DEFAULT_PRIORITY: i64 = 10;

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

/// A crawl request as submitted to any of the crawl endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Checks that the URL is non-empty and a syntactically valid
    /// http(s) URL
    pub fn parse_url(&self) -> Result<Url, String> {
        let trimmed = self.url.trim();
        if trimmed.is_empty() {
            return Err("url cannot be empty".to_string());
        }

        let url = Url::parse(trimmed).map_err(|e| format!("invalid url '{}': {}", trimmed, e))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(format!(
                    "Only HTTP and HTTPS schemes are supported, got: {}",
                    other
                ))
            }
        }

        if url.host_str().is_none() {
            return Err(format!("url '{}' has no host", trimmed));
        }

        Ok(url)
    }
}

/// Server-side record of one asynchronous crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlTask {
    pub task_id: String,
    pub url: String,
    pub priority: i64,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CrawlTask {
    /// Creates a pending task for the given request
    pub fn pending(task_id: String, request: &CrawlRequest) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            url: request.url.clone(),
            priority: request.priority,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Terminal outcome recorded against a task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The engine produced a result payload
    Completed(serde_json::Value),
    /// The engine failed; carries the error text shown to clients
    Failed(String),
}

impl TaskOutcome {
    /// The status a task moves to when this outcome is recorded
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Completed(_) => TaskStatus::Completed,
            Self::Failed(_) => TaskStatus::Failed,
        }
    }
}
