/// Task state definitions for tracking crawl task progress
///
/// A task starts `Pending` and moves exactly once to one of the terminal
/// states.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task has been accepted and the engine has not finished yet
    Pending,

    /// Engine finished and produced a result
    Completed,

    /// Engine reported a failure or could not reach the page
    Failed,
}

impl TaskStatus {
    /// Returns true if this is a terminal state (no further transitions)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if moving from `self` to `next` is allowed
    ///
    /// Only `Pending -> Completed` and `Pending -> Failed` are valid.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(self, Self::Pending) && next.is_terminal()
    }

    /// Wire representation used in task status responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a task status from its wire representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
