//! State module for tracking crawl task progress
//!
//! `TaskStatus` is the lifecycle shared by the task store, the service's
//! status route and the client's polling loop.

mod task_state;

pub use task_state::TaskStatus;
