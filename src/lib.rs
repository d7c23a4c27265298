//! Crawl-Relay: a crawl service and its polling client
//!
//! The service accepts a URL, hands it to a crawl engine, and returns the
//! extracted markdown either inline or through an asynchronous task that the
//! client polls until it reaches a terminal state.

pub mod client;
pub mod config;
pub mod engine;
pub mod service;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Crawl-Relay operations
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] engine::EngineError),

    #[error("Task store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error(transparent)]
    Client(#[from] client::ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Crawl-Relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use client::{ClientConfig, CrawlClient, Mode};
pub use config::Config;
pub use engine::{CrawlEngine, CrawlResult, EngineOutcome, HttpEngine, RunConfig};
pub use state::TaskStatus;
pub use storage::{CrawlRequest, CrawlTask, InMemoryTaskStore, TaskStore};
