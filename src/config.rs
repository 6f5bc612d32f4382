//! Client configuration
//!
//! Read from an optional YAML file. Every key has a default, so an empty
//! file or no file at all gives a client for a server on localhost.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::input_validation::validate_server_url;
use crate::logging::DEFAULT_MAX_LOG_LINES;
use crate::search::{SearchSettings, DEFAULT_SEARCH_ITEMS, MIN_QUERY_LEN};

pub const DEFAULT_SERVER: &str = "http://localhost:8888";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ClientConfig {
    pub server: String,
    pub backoff_ms: u64,
    pub debounce_ms: u64,
    pub search_items: usize,
    pub min_search_len: usize,
    pub max_log_lines: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            backoff_ms: 1000,
            debounce_ms: 600,
            search_items: DEFAULT_SEARCH_ITEMS,
            min_search_len: MIN_QUERY_LEN,
            max_log_lines: DEFAULT_MAX_LOG_LINES,
        }
    }
}

impl ClientConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        // an empty document deserializes to null, not to an empty map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text).context("Invalid client configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("In config {}", path.display()))
    }

    pub fn with_server(mut self, server: Option<String>) -> Result<Self> {
        if let Some(server) = server {
            validate_server_url(&server)?;
            self.server = server;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        validate_server_url(&self.server)?;
        if self.search_items == 0 {
            anyhow::bail!("search_items must be at least 1");
        }
        if self.max_log_lines == 0 {
            anyhow::bail!("max_log_lines must be at least 1");
        }
        Ok(())
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            debounce: Duration::from_millis(self.debounce_ms),
            min_len: self.min_search_len,
            items: self.search_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server, "http://localhost:8888");
        assert_eq!(config.backoff(), Duration::from_millis(1000));
        assert_eq!(config.search_settings(), SearchSettings::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ClientConfig::from_yaml("server: http://oqta.local:8888\nsearch_items: 50\n").unwrap();
        assert_eq!(config.server, "http://oqta.local:8888");
        assert_eq!(config.search_items, 50);
        assert_eq!(config.debounce_ms, 600);
        assert_eq!(ClientConfig::from_yaml("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        assert!(ClientConfig::from_yaml("server: ftp://nope\n").is_err());
        assert!(ClientConfig::from_yaml("search_items: 0\n").is_err());
        assert!(ClientConfig::from_yaml("backoff_ms: soon\n").is_err());
    }

    #[test]
    fn test_load_from_file_and_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drivesync.yaml");
        fs::write(&path, "debounce_ms: 250\n").unwrap();

        let config = ClientConfig::load(Some(&path))
            .unwrap()
            .with_server(Some("http://10.0.0.7:8888".to_string()))
            .unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.server, "http://10.0.0.7:8888");

        assert!(ClientConfig::load(Some(&dir.path().join("missing.yaml"))).is_err());
        assert_eq!(ClientConfig::load(None).unwrap(), ClientConfig::default());
    }
}
