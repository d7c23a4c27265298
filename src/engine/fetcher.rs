//! HTTP crawl engine
//!
//! This module fetches pages over plain HTTP and converts them to markdown:
//! - Building the HTTP client with the configured user agent
//! - GET requests with cache bypass when caching is disabled
//! - Error classification into `EngineOutcome` variants
//! - Inlining iframe content

use crate::config::EngineConfig;
use crate::engine::extract::extract_page;
use crate::engine::{CacheMode, CrawlEngine, CrawlResult, EngineError, EngineOutcome, RunConfig};
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// Maximum number of iframes fetched per page
const MAX_IFRAMES: usize = 5;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The engine configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &EngineConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.page_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Engine that fetches a page with a single GET and converts the HTML body
pub struct HttpEngine {
    client: Client,
}

impl HttpEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    async fn get(&self, url: &Url, config: &RunConfig) -> Result<Response, reqwest::Error> {
        let mut request = self.client.get(url.clone()).timeout(config.page_timeout);
        if config.cache_mode == CacheMode::Disabled {
            request = request
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }
        request.send().await
    }

    /// Fetches iframe sources and renders each one as its own section
    async fn render_iframes(&self, sources: &[Url], config: &RunConfig) -> Vec<String> {
        let mut sections = Vec::new();

        for source in sources.iter().take(MAX_IFRAMES) {
            let response = match self.get(source, config).await {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    tracing::debug!("Skipping iframe {}: HTTP {}", source, response.status());
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Skipping iframe {}: {}", source, e);
                    continue;
                }
            };

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!("Skipping iframe {}: {}", source, e);
                    continue;
                }
            };

            match extract_page(
                &body,
                source,
                config.remove_overlay_elements,
                config.word_count_threshold,
            ) {
                Ok(page) if !page.markdown.trim().is_empty() => sections.push(page.markdown),
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping iframe {}: {}", source, e),
            }
        }

        sections
    }
}

#[async_trait]
impl CrawlEngine for HttpEngine {
    /// Fetches and converts a page
    ///
    /// # Outcome mapping
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | Timeout, connection refused, TLS error | Transport |
    /// | Non-2xx status | Failed (with status code) |
    /// | Non-text Content-Type | Failed |
    /// | Markdown conversion error | Failed |
    /// | text/plain or text/markdown body | Success (body as-is) |
    /// | HTML body | Success (converted) |
    async fn crawl(&self, url: &Url, config: &RunConfig) -> EngineOutcome {
        let response = match self.get(url, config).await {
            Ok(response) => response,
            Err(e) => return EngineOutcome::Transport(classify_transport_error(url, &e)),
        };

        let status = response.status();
        if !status.is_success() {
            return EngineOutcome::Failed {
                status_code: Some(status.as_u16()),
                error_message: format!("HTTP {} for {}", status, url),
            };
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let final_url = response.url().clone();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return EngineOutcome::Transport(classify_transport_error(url, &e)),
        };

        let status_code = Some(status.as_u16());

        if content_type.starts_with("text/plain") || content_type.starts_with("text/markdown") {
            return EngineOutcome::Success(CrawlResult::success(body, status_code));
        }

        if !content_type.is_empty() && !content_type.contains("html") {
            return EngineOutcome::Failed {
                status_code,
                error_message: format!("Unsupported content type: {}", content_type),
            };
        }

        let page = match extract_page(
            &body,
            &final_url,
            config.remove_overlay_elements,
            config.word_count_threshold,
        ) {
            Ok(page) => page,
            Err(e) => {
                return EngineOutcome::Failed {
                    status_code,
                    error_message: format!("Markdown conversion failed: {}", e),
                }
            }
        };

        let mut markdown = page.markdown;
        if config.process_iframes && !page.iframe_sources.is_empty() {
            for section in self.render_iframes(&page.iframe_sources, config).await {
                markdown.push_str("\n\n");
                markdown.push_str(&section);
            }
        }

        tracing::debug!(
            "Converted {} ({} bytes of markdown, title: {:?})",
            final_url,
            markdown.len(),
            page.title
        );

        EngineOutcome::Success(CrawlResult::success(markdown, status_code))
    }
}

fn classify_transport_error(url: &Url, e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("Request timeout for {}", url)
    } else if e.is_connect() {
        format!("Connection failed for {}: {}", url, e)
    } else {
        format!("Request failed for {}: {}", url, e)
    }
}
