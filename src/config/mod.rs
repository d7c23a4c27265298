//! Configuration module for the crawl service
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Every key has a default, so an absent file is the
//! same as an empty one.
//!
//! # Example
//!
//! ```no_run
//! use crawl_relay::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl-service.toml")).unwrap();
//! println!("Listening on port {}", config.server.port);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{AuthConfig, Config, EngineConfig, ServerConfig, TaskConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
