// crates/core/src/llm/config.rs
//! Serving-endpoint configuration.

use std::time::Duration;

/// Configuration for the model-serving endpoint used for translation.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Workspace host, e.g. `https://example.cloud.databricks.com`.
    pub host: String,
    pub token: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            token: None,
            max_tokens: 2000,
            temperature: 0.1,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Read `DATABRICKS_HOST`, `DATABRICKS_TOKEN` and `DW_MIGRATE_LLM_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("DATABRICKS_HOST").unwrap_or_default(),
            token: std::env::var("DATABRICKS_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout_secs: std::env::var("DW_MIGRATE_LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            ..defaults
        }
    }

    /// Base URL of the OpenAI-compatible API.
    pub fn base_url(&self) -> String {
        format!("{}/serving-endpoints", normalize_host(&self.host))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && self.token.is_some()
    }
}

/// Prefix `https://` when missing and drop any trailing slash.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let config = LlmConfig {
            host: "https://example.cloud.databricks.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.base_url(),
            "https://example.cloud.databricks.com/serving-endpoints"
        );
    }

    #[test]
    fn test_normalize_host_adds_scheme() {
        assert_eq!(normalize_host("example.com"), "https://example.com");
        assert_eq!(normalize_host("http://127.0.0.1:1234"), "http://127.0.0.1:1234");
    }

    #[test]
    fn test_is_configured() {
        let mut config = LlmConfig::default();
        assert!(!config.is_configured());
        config.host = "example.com".to_string();
        assert!(!config.is_configured());
        config.token = Some("dapi-123".to_string());
        assert!(config.is_configured());
    }
}
