// crates/server/src/config.rs
//! Server configuration from the environment.

use std::time::Duration;

use crate::jobs::DEFAULT_POLL_INTERVAL;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How often stream consumers poll a job.
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Read `DW_MIGRATE_HOST`, `DW_MIGRATE_PORT` (or `PORT`) and
    /// `DW_MIGRATE_POLL_INTERVAL_MS`. Unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let port = lookup("DW_MIGRATE_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let poll_interval = lookup("DW_MIGRATE_POLL_INTERVAL_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);
        Self {
            host: lookup("DW_MIGRATE_HOST")
                .filter(|h| !h.is_empty())
                .unwrap_or(defaults.host),
            port,
            poll_interval,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
