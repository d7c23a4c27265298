//! Storage traits and error types
//!
//! This module defines the trait interface for task store backends and
//! associated error types.

use crate::state::TaskStatus;
use crate::storage::{CrawlRequest, CrawlTask, TaskOutcome};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during task store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Task store lock poisoned")]
    LockPoisoned,
}

/// Result type for task store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for task store implementations
///
/// Implementations must be safe to share between the request handlers that
/// read task state and the dispatched crawls that write it.
pub trait TaskStore: Send + Sync {
    /// Creates a pending task for `request` and returns its new, unique id
    fn create(&self, request: &CrawlRequest) -> StoreResult<String>;

    /// Gets a task by id, or `None` if it is unknown or was evicted
    fn get(&self, task_id: &str) -> StoreResult<Option<CrawlTask>>;

    /// Records the terminal outcome of a task
    ///
    /// Fails with `InvalidTransition` if the task is already terminal; the
    /// stored record is left untouched in that case.
    fn update(&self, task_id: &str, outcome: TaskOutcome) -> StoreResult<()>;

    /// Removes terminal tasks whose retention period has elapsed at `now`
    ///
    /// # Returns
    ///
    /// The number of tasks removed
    fn evict_expired(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    /// Number of tasks currently held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
