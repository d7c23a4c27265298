use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the crawl service
///
/// Every section is optional in the TOML file; missing keys fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub tasks: TaskConfig,
    pub auth: AuthConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 11235,
        }
    }
}

/// Crawl engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// User agent sent with every page fetch
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-page fetch timeout (seconds)
    #[serde(rename = "page-timeout-secs")]
    pub page_timeout_secs: u64,

    /// Whether the engine may serve cached responses
    #[serde(rename = "cache-enabled")]
    pub cache_enabled: bool,

    /// Minimum number of words for a text block to be kept
    #[serde(rename = "word-count-threshold")]
    pub word_count_threshold: usize,

    /// Fetch iframe sources and append their content
    #[serde(rename = "process-iframes")]
    pub process_iframes: bool,

    /// Drop popups, modals and cookie banners before extraction
    #[serde(rename = "remove-overlay-elements")]
    pub remove_overlay_elements: bool,

    /// Upper bound on engine runs executing at the same time
    #[serde(rename = "max-concurrent-crawls")]
    pub max_concurrent_crawls: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("crawl-relay/{}", env!("CARGO_PKG_VERSION")),
            page_timeout_secs: 60,
            cache_enabled: false,
            word_count_threshold: 10,
            process_iframes: true,
            remove_overlay_elements: true,
            max_concurrent_crawls: 16,
        }
    }
}

impl EngineConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

/// Task store retention configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// How long a finished task stays queryable (seconds)
    #[serde(rename = "retention-secs")]
    pub retention_secs: u64,

    /// How often expired tasks are swept (seconds)
    #[serde(rename = "sweep-interval-secs")]
    pub sweep_interval_secs: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

impl TaskConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the environment variable holding the bearer token
    #[serde(rename = "token-env")]
    pub token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: crate::client::TOKEN_ENV_VAR.to_string(),
        }
    }
}
