//! Crawl engine module
//!
//! The service never renders pages itself; it hands a URL and a fixed
//! `RunConfig` to a `CrawlEngine` and branches on the tagged
//! `EngineOutcome` it gets back. This module contains:
//! - The `CrawlEngine` trait and its input/output types
//! - `HttpEngine`, which fetches a page and converts it to markdown
//! - HTML cleanup and markdown extraction
//! - `MockEngine`, a scripted engine for tests (`test-util` feature)

mod extract;
mod fetcher;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use extract::{extract_page, filter_blocks, ExtractedPage};
pub use fetcher::{build_http_client, HttpEngine};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockEngine;

use crate::config::EngineConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while setting up an engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Whether an engine may reuse cached responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Enabled,
    Disabled,
}

/// Per-run settings handed to the engine with every crawl
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub cache_mode: CacheMode,
    /// Paragraphs with fewer words than this are dropped
    pub word_count_threshold: usize,
    pub process_iframes: bool,
    pub remove_overlay_elements: bool,
    pub page_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for RunConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            cache_mode: if config.cache_enabled {
                CacheMode::Enabled
            } else {
                CacheMode::Disabled
            },
            word_count_threshold: config.word_count_threshold,
            process_iframes: config.process_iframes,
            remove_overlay_elements: config.remove_overlay_elements,
            page_timeout: config.page_timeout(),
        }
    }
}

/// Result of one engine run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub success: bool,
    pub markdown: String,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
}

impl CrawlResult {
    pub fn success(markdown: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            success: true,
            markdown: markdown.into(),
            status_code,
            error_message: None,
        }
    }
}

/// Outcome of a crawl, tagged by how it ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// The page was fetched and converted
    Success(CrawlResult),

    /// The engine reached the page but reported a failure
    Failed {
        status_code: Option<u16>,
        error_message: String,
    },

    /// The page could not be reached at all
    Transport(String),
}

impl EngineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// A page fetch/render capability
#[async_trait]
pub trait CrawlEngine: Send + Sync {
    /// Crawls `url` once with the given run settings
    async fn crawl(&self, url: &Url, config: &RunConfig) -> EngineOutcome;
}
