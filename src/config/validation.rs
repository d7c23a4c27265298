use crate::config::types::{AuthConfig, Config, EngineConfig, ServerConfig, TaskConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_engine_config(&config.engine)?;
    validate_task_config(&config.tasks)?;
    validate_auth_config(&config.auth)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.host.is_empty() {
        return Err(ConfigError::Validation(
            "server host cannot be empty".to_string(),
        ));
    }

    if config.port == 0 {
        return Err(ConfigError::Validation(
            "server port must be non-zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.page_timeout_secs < 1 || config.page_timeout_secs > 600 {
        return Err(ConfigError::Validation(format!(
            "page-timeout-secs must be between 1 and 600, got {}",
            config.page_timeout_secs
        )));
    }

    if config.max_concurrent_crawls < 1 || config.max_concurrent_crawls > 256 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-crawls must be between 1 and 256, got {}",
            config.max_concurrent_crawls
        )));
    }

    Ok(())
}

fn validate_task_config(config: &TaskConfig) -> Result<(), ConfigError> {
    if config.retention_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "retention-secs must be >= 1, got {}",
            config.retention_secs
        )));
    }

    if config.sweep_interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "sweep-interval-secs must be >= 1, got {}",
            config.sweep_interval_secs
        )));
    }

    Ok(())
}

fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    if config.token_env.is_empty() {
        return Err(ConfigError::Validation(
            "token-env cannot be empty".to_string(),
        ));
    }

    if !config
        .token_env
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "token-env must be a valid environment variable name, got '{}'",
            config.token_env
        )));
    }

    Ok(())
}
