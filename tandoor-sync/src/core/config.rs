use std::str::FromStr;
use std::time::Duration;

use shared::models::PriorityThresholds;
use tandoor_client::{ClientConfig, ClientType};

/// Synchronization agent configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | ORDER_API_URL | http://localhost:5000/api | order API base URL |
/// | ORDER_API_TOKEN | - | bearer token |
/// | ORDER_API_MODE | http | `http` or `in-process` backend |
/// | REQUEST_TIMEOUT_SECS | 30 | HTTP timeout (seconds) |
/// | MAX_TABLES | 50 | highest valid table number |
/// | PRIORITY_REFRESH_SECS | 60 | dashboard refresh interval (seconds) |
/// | PRIORITY_MEDIUM_MINUTES | 15 | age at which an order turns medium |
/// | PRIORITY_HIGH_MINUTES | 30 | age past which an order turns high |
/// | TABLE_NUMBER | - | table the agent opens a session for |
/// | LOG_LEVEL | info | log level |
/// | LOG_DIR | - | daily rolling log directory |
///
/// # Example
///
/// ```ignore
/// ORDER_API_URL=http://pos.local/api TABLE_NUMBER=5 cargo run -p tandoor-sync
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_token: Option<String>,
    pub api_mode: ClientType,
    pub request_timeout_secs: u64,
    pub max_tables: u32,
    pub priority_refresh_secs: u64,
    pub priority_medium_minutes: i64,
    pub priority_high_minutes: i64,
    pub table_number: Option<u32>,
    pub log_level: String,
    pub log_dir: Option<String>,
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key source. Unparseable values use the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_url: non_empty(&lookup, "ORDER_API_URL")
                .unwrap_or_else(|| "http://localhost:5000/api".into()),
            api_token: non_empty(&lookup, "ORDER_API_TOKEN"),
            api_mode: parsed(&lookup, "ORDER_API_MODE", ClientType::Http),
            request_timeout_secs: parsed(&lookup, "REQUEST_TIMEOUT_SECS", 30),
            max_tables: parsed(&lookup, "MAX_TABLES", 50),
            priority_refresh_secs: parsed(&lookup, "PRIORITY_REFRESH_SECS", 60).max(1),
            priority_medium_minutes: parsed(&lookup, "PRIORITY_MEDIUM_MINUTES", 15),
            priority_high_minutes: parsed(&lookup, "PRIORITY_HIGH_MINUTES", 30),
            table_number: non_empty(&lookup, "TABLE_NUMBER").and_then(|v| v.parse().ok()),
            log_level: non_empty(&lookup, "LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: non_empty(&lookup, "LOG_DIR"),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.api_url.clone())
            .with_client_type(self.api_mode)
            .with_timeout(self.request_timeout_secs);
        match &self.api_token {
            Some(token) => config.with_token(token.clone()),
            None => config,
        }
    }

    pub fn priority_thresholds(&self) -> PriorityThresholds {
        PriorityThresholds::from_minutes(self.priority_medium_minutes, self.priority_high_minutes)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.priority_refresh_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert_eq!(config.max_tables, 50);
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.priority_thresholds(), PriorityThresholds::default());
        assert!(config.table_number.is_none());
        assert!(config.client_config().token.is_none());
        assert_eq!(config.client_config().client_type, ClientType::Http);
    }

    #[test]
    fn test_api_mode_selects_backend() {
        let unknown = config(&[("ORDER_API_MODE", "carrier-pigeon")]);
        assert_eq!(unknown.api_mode, ClientType::Http);

        let config = config(&[("ORDER_API_MODE", "in-process")]);
        assert_eq!(config.client_config().client_type, ClientType::InProcess);
        // tandoor-client is built with `in-process` for this crate's tests
        let api = config.client_config().build().unwrap();
        assert_eq!(Arc::strong_count(&api), 1);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("ORDER_API_URL", "http://pos.local/api"),
            ("ORDER_API_TOKEN", "secret"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("TABLE_NUMBER", " 7 "),
            ("PRIORITY_MEDIUM_MINUTES", "10"),
        ]);
        let client = config.client_config();
        assert_eq!(client.base_url, "http://pos.local/api");
        assert_eq!(client.token.as_deref(), Some("secret"));
        assert_eq!(client.timeout, 5);
        assert_eq!(config.table_number, Some(7));
        assert_eq!(
            config.priority_thresholds(),
            PriorityThresholds::from_minutes(10, 30)
        );
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = config(&[("MAX_TABLES", "many"), ("PRIORITY_REFRESH_SECS", "0")]);
        assert_eq!(config.max_tables, 50);
        assert_eq!(config.priority_refresh_secs, 1);
    }
}
