use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub telemetry: TelemetryConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Where the inference service lives and which backend to start on.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Root URL that `/backends`, `/infer` and `/metrics/summary` hang off.
    pub base_url: String,
    pub default_backend: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            base_url: "http://127.0.0.1:8000/".to_string(),
            default_backend: "cpu".to_string(),
        }
    }
}

impl ServiceConfig {
    /// WebSocket URL of the telemetry feed: the service root with `http`
    /// swapped for `ws` (or `https` for `wss`) and `stream_path` appended.
    pub fn telemetry_url(&self, stream_path: &str) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Validation(format!("service.base_url is not a valid URL: {e}"))
        })?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(ConfigError::Validation(format!(
                    "service.base_url must use http or https, got {other}"
                )))
            }
        };
        url.set_scheme(scheme).map_err(|_| {
            ConfigError::Validation(format!("cannot derive {scheme} URL from service.base_url"))
        })?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.join(stream_path.trim_start_matches('/')).map_err(|e| {
            ConfigError::Validation(format!("telemetry.stream_path is not a valid path: {e}"))
        })
    }
}

/// Live telemetry subscription settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Path of the push feed, relative to the service root.
    pub stream_path: String,
    /// Fixed wait between a dropped connection and the next attempt.
    pub reconnect_delay_ms: u64,
    /// Samples kept for display; the oldest are evicted first.
    pub buffer_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig {
            stream_path: "ws/telemetry".to_string(),
            reconnect_delay_ms: 2000,
            buffer_capacity: 128,
        }
    }
}

impl TelemetryConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How often the metrics summary is refreshed.
    pub summary_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            summary_interval_ms: 5000,
        }
    }
}

impl SessionConfig {
    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            // Logging is configured from this file, so nothing is listening yet.
            eprintln!("Warning: config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.default_backend.trim().is_empty() {
            return Err(ConfigError::Validation(
                "service.default_backend must not be empty".into(),
            ));
        }
        if self.telemetry.stream_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "telemetry.stream_path must not be empty".into(),
            ));
        }
        // Also checks service.base_url
        self.service.telemetry_url(&self.telemetry.stream_path)?;

        if self.telemetry.reconnect_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "telemetry.reconnect_delay_ms must be > 0".into(),
            ));
        }
        if self.telemetry.buffer_capacity == 0 {
            return Err(ConfigError::Validation(
                "telemetry.buffer_capacity must be > 0".into(),
            ));
        }
        if self.session.summary_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "session.summary_interval_ms must be > 0".into(),
            ));
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(ConfigError::Validation(format!(
                "logging.level '{}' is not a valid filter",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
        assert_eq!(config.telemetry.reconnect_delay(), Duration::from_millis(2000));
        assert_eq!(config.telemetry.buffer_capacity, 128);
        assert_eq!(config.session.summary_interval(), Duration::from_millis(5000));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[service]
default_backend = "gpu"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.service.default_backend, "gpu");
        // Other fields should be defaults
        assert_eq!(config.service.base_url, "http://127.0.0.1:8000/");
        assert_eq!(config.telemetry.reconnect_delay_ms, 2000);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        let default = AppConfig::default();
        assert_eq!(config.service.base_url, default.service.base_url);
        assert_eq!(config.telemetry.buffer_capacity, default.telemetry.buffer_capacity);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_telemetry_url_swaps_scheme() {
        let service = ServiceConfig {
            base_url: "http://localhost:8000/api".to_string(),
            ..Default::default()
        };
        assert_eq!(
            service.telemetry_url("ws/telemetry").unwrap().as_str(),
            "ws://localhost:8000/api/ws/telemetry"
        );

        let service = ServiceConfig {
            base_url: "https://bench.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            service.telemetry_url("/ws/telemetry").unwrap().as_str(),
            "wss://bench.example.com/ws/telemetry"
        );
    }

    #[test]
    fn test_validation_rejects_non_http_base_url() {
        let mut config = AppConfig::default();
        config.service.base_url = "ftp://example.com/".to_string();
        assert!(config.validate().is_err());

        config.service.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_backend() {
        let mut config = AppConfig::default();
        config.service.default_backend = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_reconnect_delay() {
        let mut config = AppConfig::default();
        config.telemetry.reconnect_delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let mut config = AppConfig::default();
        config.telemetry.buffer_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_summary_interval() {
        let mut config = AppConfig::default();
        config.session.summary_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "showdown=loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_showdown.toml")).unwrap();
        assert_eq!(config.service.default_backend, "cpu");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("showdown.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[telemetry]
reconnect_delay_ms = 250
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.telemetry.reconnect_delay_ms, 250);
        // Others are defaults
        assert_eq!(config.telemetry.buffer_capacity, 128);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("showdown.toml");
        std::fs::write(&path, "[telemetry]\nbuffer_capacity = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_load_reports_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("showdown.toml");
        std::fs::write(&path, "[telemetry\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
    }
}
