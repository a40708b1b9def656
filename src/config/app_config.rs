use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{
    deserialize_duration_from_seconds, ChannelConfig, HttpRetryConfig, RateLimitConfig,
    ServerConfig,
};

fn default_notification_interval() -> Duration {
    Duration::from_secs(1800)
}

fn default_dashboard_base_url() -> Url {
    Url::parse("http://localhost:3000").expect("static URL is valid")
}

/// Application configuration for Pulse.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Database URL for the SQLite analytics store.
    pub database_url: String,

    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Ingest admission-control settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Default retry policy for outbound webhook deliveries.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,

    /// Period of the anomaly notification cycle, in seconds. The first cycle
    /// runs at process start.
    #[serde(
        default = "default_notification_interval",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub notification_interval_secs: Duration,

    /// Base URL of the dashboard used to build "Investigate" deep links.
    #[serde(default = "default_dashboard_base_url")]
    pub dashboard_base_url: Url,

    /// Configured outbound notification channels. An empty list disables the
    /// notification pipeline entirely.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading `app.yaml` from the configuration
    /// directory, with `PULSE__*` environment variables taking precedence.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)))
            .add_source(Environment::with_prefix("PULSE").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            server: ServerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            http_retry_config: HttpRetryConfig::default(),
            notification_interval_secs: default_notification_interval(),
            dashboard_base_url: default_dashboard_base_url(),
            channels: Vec::new(),
        }
    }
}

/// A builder for creating `AppConfig` instances for testing.
#[cfg(test)]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn database_url(mut self, url: &str) -> Self {
        self.config.database_url = url.to_string();
        self
    }

    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    pub fn channels(mut self, channels: Vec<ChannelConfig>) -> Self {
        self.config.channels = channels;
        self
    }

    pub fn dashboard_base_url(mut self, url: &str) -> Self {
        self.config.dashboard_base_url = Url::parse(url).expect("test URL must parse");
        self
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.config.server.api_key = Some(key.to_string());
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_yaml_file() {
        let config_content = r#"
        database_url: "sqlite::memory:"
        notification_interval_secs: 600
        dashboard_base_url: "https://pulse.example.com"
        rate_limit:
          points: 100
          window_secs: 60
        channels:
          - type: slack
            webhook_url: "https://hooks.slack.com/services/T/B/X"
        "#;
        let temp_dir = tempfile::tempdir().unwrap();
        let app_yaml_path = temp_dir.path().join("app.yaml");
        std::fs::write(&app_yaml_path, config_content).unwrap();

        let config = AppConfig::new(Some(temp_dir.path().to_str().unwrap())).unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.notification_interval_secs, Duration::from_secs(600));
        assert_eq!(
            config.dashboard_base_url.as_str(),
            "https://pulse.example.com/"
        );
        assert_eq!(config.rate_limit.points, 100);
        assert_eq!(config.channels.len(), 1);
    }

    #[test]
    fn defaults_apply_when_omitted() {
        let config_content = r#"
        database_url: "sqlite::memory:"
        "#;
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("app.yaml"), config_content).unwrap();

        let config = AppConfig::new(Some(temp_dir.path().to_str().unwrap())).unwrap();

        assert_eq!(
            config.notification_interval_secs,
            default_notification_interval()
        );
        assert!(config.channels.is_empty());
        assert_eq!(config.rate_limit.points, 1000);
        assert_eq!(config.server.listen_address, "0.0.0.0:8080");
    }

    #[test]
    fn builder_produces_usable_config() {
        let config = AppConfig::builder()
            .database_url("sqlite::memory:")
            .api_key("secret")
            .dashboard_base_url("https://dash.example.com")
            .build();

        assert_eq!(config.server.api_key.as_deref(), Some("secret"));
        assert_eq!(
            config.dashboard_base_url.as_str(),
            "https://dash.example.com/"
        );
    }
}
