use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const BACKEND_URL_ENV: &str = "REDDIT_HELPER_BACKEND_URL";
pub const SUMMARY_PATH: &str = "generate_summary";

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_STABILIZATION_DELAY_MS: u64 = 500;
const DEFAULT_ICON_URL: &str = "icon48.png";
const DEFAULT_LOG_FILTER: &str = "reddit_helper=info,background_service=info,content_script=info,summary_client=info,helper_core=info";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HelperConfig {
    pub backend: BackendConfig,
    pub content: ContentConfig,
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// 0 disables the timeout; requests may then hang indefinitely.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub stabilization_delay_ms: u64,
    pub icon_url: String,
    pub markdown: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub single_flight_per_tab: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: 0,
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            stabilization_delay_ms: DEFAULT_STABILIZATION_DELAY_MS,
            icon_url: DEFAULT_ICON_URL.to_string(),
            markdown: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl BackendConfig {
    pub fn summary_endpoint(&self) -> Result<Url, ConfigError> {
        let base = self.base_url.trim_end_matches('/');
        let endpoint = format!("{}/{}", base, SUMMARY_PATH);
        let url = Url::parse(&endpoint).map_err(|_| ConfigError::InvalidValue {
            field: "backend.base_url".to_string(),
            value: self.base_url.clone(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::ValidationFailed {
                reason: format!("backend.base_url must use http or https, got '{}'", other),
            }),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl ContentConfig {
    pub fn stabilization_delay(&self) -> Duration {
        Duration::from_millis(self.stabilization_delay_ms)
    }
}

impl HelperConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&raw)
    }

    /// Loads `path` if given, falls back to defaults otherwise, then applies
    /// environment overrides and validates.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        let config = config.with_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|url| !url.trim().is_empty()) {
            debug!("Backend URL overridden from {}", BACKEND_URL_ENV);
            self.backend.base_url = url.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.summary_endpoint()?;

        if self.content.icon_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "content.icon_url".to_string(),
                value: self.content.icon_url.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HelperConfig::default();
        assert_eq!(
            config.backend.summary_endpoint().unwrap().as_str(),
            "http://localhost:8000/generate_summary"
        );
        assert_eq!(config.backend.request_timeout(), None);
        assert_eq!(config.content.stabilization_delay(), Duration::from_millis(500));
        assert_eq!(config.content.icon_url, "icon48.png");
        assert!(config.content.markdown);
        assert!(!config.orchestrator.single_flight_per_tab);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HelperConfig::from_toml_str(
            r#"
            [backend]
            base_url = "https://summaries.example.com/api/"
            request_timeout_secs = 20

            [orchestrator]
            single_flight_per_tab = true
            "#,
        )
        .unwrap();

        assert_eq!(
            config.backend.summary_endpoint().unwrap().as_str(),
            "https://summaries.example.com/api/generate_summary"
        );
        assert_eq!(config.backend.request_timeout(), Some(Duration::from_secs(20)));
        assert!(config.orchestrator.single_flight_per_tab);
        assert_eq!(config.content.stabilization_delay_ms, 500);
    }

    #[test]
    fn test_invalid_toml() {
        let result = HelperConfig::from_toml_str("[backend\nbase_url = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_override() {
        let config = HelperConfig::default().with_overrides(|key| {
            (key == BACKEND_URL_ENV).then(|| "http://10.0.0.5:9000".to_string())
        });
        assert_eq!(
            config.backend.summary_endpoint().unwrap().as_str(),
            "http://10.0.0.5:9000/generate_summary"
        );
    }

    #[test]
    fn test_rejects_non_http_backend() {
        let mut config = HelperConfig::default();
        config.backend.base_url = "ftp://example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));

        config.backend.base_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = HelperConfig::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }
}
