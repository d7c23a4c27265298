//! In-memory task store
//!
//! Tasks live in a `HashMap` behind an `RwLock`. Status reads share the
//! lock; creation, completion and eviction take it exclusively. No lock is
//! held across an await point.

use crate::storage::traits::{StoreError, StoreResult, TaskStore};
use crate::storage::{CrawlRequest, CrawlTask, TaskOutcome};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

/// Task store backed by process memory
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, CrawlTask>>,
    retention: chrono::Duration,
}

impl InMemoryTaskStore {
    /// Creates an empty store
    ///
    /// # Arguments
    ///
    /// * `retention` - How long a terminal task stays queryable after it
    ///   finished
    pub fn new(retention: Duration) -> Self {
        let retention =
            chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self {
            tasks: RwLock::new(HashMap::new()),
            retention,
        }
    }

    fn is_expired(&self, task: &CrawlTask, now: DateTime<Utc>) -> bool {
        task.status.is_terminal() && now - task.updated_at >= self.retention
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl TaskStore for InMemoryTaskStore {
    fn create(&self, request: &CrawlRequest) -> StoreResult<String> {
        let mut tasks = self.tasks.write().map_err(|_| StoreError::LockPoisoned)?;

        let mut task_id = Uuid::new_v4().to_string();
        while tasks.contains_key(&task_id) {
            task_id = Uuid::new_v4().to_string();
        }

        tasks.insert(task_id.clone(), CrawlTask::pending(task_id.clone(), request));
        tracing::debug!("Created task {} for {}", task_id, request.url);

        Ok(task_id)
    }

    fn get(&self, task_id: &str) -> StoreResult<Option<CrawlTask>> {
        let tasks = self.tasks.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tasks.get(task_id).cloned())
    }

    fn update(&self, task_id: &str, outcome: TaskOutcome) -> StoreResult<()> {
        let mut tasks = self.tasks.write().map_err(|_| StoreError::LockPoisoned)?;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| StoreError::TaskNotFound(task_id.to_string()))?;

        let next = outcome.status();
        if !task.status.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                task_id: task_id.to_string(),
                from: task.status,
                to: next,
            });
        }

        match outcome {
            TaskOutcome::Completed(payload) => task.result = Some(payload),
            TaskOutcome::Failed(error) => task.error = Some(error),
        }
        task.status = next;
        task.updated_at = Utc::now();

        tracing::debug!("Task {} -> {}", task_id, next);
        Ok(())
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut tasks = self.tasks.write().map_err(|_| StoreError::LockPoisoned)?;
        let before = tasks.len();
        tasks.retain(|_, task| !self.is_expired(task, now));
        Ok(before - tasks.len())
    }

    fn len(&self) -> usize {
        self.tasks.read().map(|tasks| tasks.len()).unwrap_or(0)
    }
}
