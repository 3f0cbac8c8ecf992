//! Client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::delivery::QueueConfig;

/// Path of the rendering module under the API host
pub const RENDERER_PATH: &str = "/js/surveys.umd.cjs";

/// Connection and delivery settings for one environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the collection API
    pub api_host: String,

    /// Environment the surveys and responses belong to
    pub environment_id: String,

    /// Extra submission attempts after the first before the queue halts
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Pause between automatic submission attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl ClientConfig {
    pub fn new(api_host: impl Into<String>, environment_id: impl Into<String>) -> Self {
        Self {
            api_host: api_host.into(),
            environment_id: environment_id.into(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Queue settings derived from this config
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            retry_attempts: self.retry_attempts,
            retry_delay: self.retry_delay(),
        }
    }

    /// Where the rendering module is fetched from
    pub fn renderer_url(&self) -> String {
        format!("{}{}", self.api_host.trim_end_matches('/'), RENDERER_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_delivery_defaults() {
        let config = ClientConfig::new("https://surveys.example.com", "env-1");
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
    }

    #[test]
    fn renderer_url_ignores_trailing_slash() {
        let config = ClientConfig::new("https://surveys.example.com/", "env-1");
        assert_eq!(
            config.renderer_url(),
            "https://surveys.example.com/js/surveys.umd.cjs"
        );
    }

    #[test]
    fn test_deserialize_toml_defaults() {
        let toml = r#"
            api_host = "http://localhost:3000"
            environment_id = "env-1"
        "#;
        let config: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.retry_delay_ms, 1000);
    }

    #[test]
    fn test_deserialize_toml_overrides() {
        let toml = r#"
            api_host = "http://localhost:3000"
            environment_id = "env-1"
            retry_attempts = 5
            retry_delay_ms = 250
        "#;
        let config: ClientConfig = toml::from_str(toml).unwrap();
        let queue = config.queue_config();
        assert_eq!(queue.retry_attempts, 5);
        assert_eq!(queue.retry_delay, Duration::from_millis(250));
    }
}
