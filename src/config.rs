//! Configuration management for `stylecast`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::StyleError;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for `stylecast`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Forecast source configuration
    pub forecast: ForecastConfig,
    /// Chat completion configuration
    pub chat: ChatConfig,
    /// Forecast normalization settings
    pub normalizer: NormalizerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Which forecast source to query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastProvider {
    /// Korea Meteorological Administration village forecast
    #[default]
    Kma,
    /// OpenWeatherMap geocoding + 5 day / 3 hour forecast
    OpenWeatherMap,
}

impl std::str::FromStr for ForecastProvider {
    type Err = StyleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kma" => Ok(ForecastProvider::Kma),
            "openweathermap" | "owm" => Ok(ForecastProvider::OpenWeatherMap),
            other => Err(StyleError::validation(format!(
                "Unknown forecast provider '{other}'. Must be one of: kma, openweathermap"
            ))),
        }
    }
}

/// Forecast source configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub provider: ForecastProvider,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// IANA time zone used for "today" and the current hour
    pub timezone: String,
    pub kma: KmaConfig,
    pub openweathermap: OpenWeatherMapConfig,
}

/// KMA village forecast settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KmaConfig {
    /// data.go.kr service key
    pub service_key: Option<String>,
    pub base_url: String,
    /// Rows requested in the single forecast page
    pub page_size: u32,
}

/// OpenWeatherMap settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenWeatherMapConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub geo_url: String,
    pub units: String,
    pub language: String,
}

/// Chat completion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Request timeout in seconds, covering the whole streamed answer
    pub timeout_seconds: u32,
}

/// Forecast normalization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Probability of precipitation above which a day counts as wet
    pub precipitation_threshold_percent: u8,
    /// Hours a slot may differ from the current hour to count as "current"
    pub current_hour_tolerance: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

// Default value functions
fn default_forecast_timeout() -> u32 {
    10
}

fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}

fn default_kma_base_url() -> String {
    "https://apis.data.go.kr/1360000/VilageFcstInfoService_2.0".to_string()
}

fn default_kma_page_size() -> u32 {
    1000
}

fn default_owm_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_owm_geo_url() -> String {
    "https://api.openweathermap.org/geo/1.0".to_string()
}

fn default_chat_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_chat_timeout() -> u32 {
    60
}

fn default_precipitation_threshold() -> u8 {
    40
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            provider: ForecastProvider::default(),
            timeout_seconds: default_forecast_timeout(),
            timezone: default_timezone(),
            kma: KmaConfig::default(),
            openweathermap: OpenWeatherMapConfig::default(),
        }
    }
}

impl Default for KmaConfig {
    fn default() -> Self {
        Self {
            service_key: None,
            base_url: default_kma_base_url(),
            page_size: default_kma_page_size(),
        }
    }
}

impl Default for OpenWeatherMapConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_owm_base_url(),
            geo_url: default_owm_geo_url(),
            units: "metric".to_string(),
            language: "kr".to_string(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_chat_base_url(),
            model: default_chat_model(),
            timeout_seconds: default_chat_timeout(),
        }
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            precipitation_threshold_percent: default_precipitation_threshold(),
            current_hour_tolerance: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl StyleConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides: STYLECAST_CHAT__API_KEY -> chat.api_key
        builder = builder.add_source(
            Environment::with_prefix("STYLECAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: StyleConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to deserialize configuration from {}", config_file.display()))?;

        config.apply_credential_fallbacks(|name| std::env::var(name).ok());
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("stylecast").join("config.toml"))
    }

    /// Fill missing credentials from the providers' conventional variables
    pub fn apply_credential_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fallback = |current: &mut Option<String>, name: &str| {
            if current.is_none() {
                *current = lookup(name).filter(|v| !v.trim().is_empty());
            }
        };
        fallback(&mut self.chat.api_key, "OPENAI_API_KEY");
        fallback(&mut self.forecast.kma.service_key, "KMA_SERVICE_KEY");
        fallback(
            &mut self.forecast.openweathermap.api_key,
            "OPENWEATHERMAP_API_KEY",
        );
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.forecast.timeout_seconds == 0 {
            self.forecast.timeout_seconds = default_forecast_timeout();
        }
        if self.forecast.timezone.is_empty() {
            self.forecast.timezone = default_timezone();
        }
        if self.forecast.kma.base_url.is_empty() {
            self.forecast.kma.base_url = default_kma_base_url();
        }
        if self.forecast.kma.page_size == 0 {
            self.forecast.kma.page_size = default_kma_page_size();
        }
        if self.forecast.openweathermap.base_url.is_empty() {
            self.forecast.openweathermap.base_url = default_owm_base_url();
        }
        if self.forecast.openweathermap.geo_url.is_empty() {
            self.forecast.openweathermap.geo_url = default_owm_geo_url();
        }
        if self.chat.base_url.is_empty() {
            self.chat.base_url = default_chat_base_url();
        }
        if self.chat.model.is_empty() {
            self.chat.model = default_chat_model();
        }
        if self.chat.timeout_seconds == 0 {
            self.chat.timeout_seconds = default_chat_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate credentials that are present; absent ones are checked per turn
    pub fn validate_api_keys(&self) -> Result<()> {
        let keys = [
            ("KMA service key", &self.forecast.kma.service_key),
            ("OpenWeatherMap API key", &self.forecast.openweathermap.api_key),
            ("Chat API key", &self.chat.api_key),
        ];
        for (name, key) in keys {
            if let Some(key) = key {
                if key.trim().is_empty() {
                    return Err(StyleError::config(format!(
                        "{name} cannot be empty if provided. Either remove it or provide a valid key."
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.forecast.timeout_seconds > 300 {
            return Err(StyleError::config("Forecast timeout cannot exceed 300 seconds").into());
        }

        if self.chat.timeout_seconds > 600 {
            return Err(StyleError::config("Chat timeout cannot exceed 600 seconds").into());
        }

        if self.forecast.kma.page_size > 10000 {
            return Err(StyleError::config("KMA page size cannot exceed 10000 rows").into());
        }

        if self.normalizer.precipitation_threshold_percent > 100 {
            return Err(
                StyleError::config("Precipitation threshold must be between 0 and 100").into(),
            );
        }

        if self.normalizer.current_hour_tolerance > 12 {
            return Err(StyleError::config("Current hour tolerance cannot exceed 12 hours").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(StyleError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(StyleError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("KMA base URL", &self.forecast.kma.base_url),
            ("OpenWeatherMap base URL", &self.forecast.openweathermap.base_url),
            ("OpenWeatherMap geocoding URL", &self.forecast.openweathermap.geo_url),
            ("Chat base URL", &self.chat.base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(
                    StyleError::config(format!("{name} must be a valid HTTP or HTTPS URL")).into(),
                );
            }
        }

        self.timezone()?;

        Ok(())
    }

    /// Parsed forecast time zone
    pub fn timezone(&self) -> crate::Result<Tz> {
        self.forecast.timezone.parse::<Tz>().map_err(|_| {
            StyleError::config(format!(
                "Invalid time zone '{}'. Use an IANA name such as Asia/Seoul",
                self.forecast.timezone
            ))
        })
    }

    /// Credential of the selected forecast provider
    pub fn forecast_credential(&self) -> crate::Result<&str> {
        match self.forecast.provider {
            ForecastProvider::Kma => self.kma_service_key(),
            ForecastProvider::OpenWeatherMap => self.openweathermap_api_key(),
        }
    }

    pub fn kma_service_key(&self) -> crate::Result<&str> {
        require(
            &self.forecast.kma.service_key,
            "KMA service key missing. Set forecast.kma.service_key or KMA_SERVICE_KEY.",
        )
    }

    pub fn openweathermap_api_key(&self) -> crate::Result<&str> {
        require(
            &self.forecast.openweathermap.api_key,
            "OpenWeatherMap API key missing. Set forecast.openweathermap.api_key or OPENWEATHERMAP_API_KEY.",
        )
    }

    /// Credential for the chat completion service
    pub fn chat_credential(&self) -> crate::Result<&str> {
        require(
            &self.chat.api_key,
            "Chat API key missing. Set chat.api_key or OPENAI_API_KEY.",
        )
    }
}

fn require<'a>(key: &'a Option<String>, hint: &str) -> crate::Result<&'a str> {
    key.as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| StyleError::config(hint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = StyleConfig::default();
        assert_eq!(config.forecast.provider, ForecastProvider::Kma);
        assert_eq!(config.forecast.timeout_seconds, 10);
        assert_eq!(config.forecast.kma.page_size, 1000);
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert_eq!(config.normalizer.precipitation_threshold_percent, 40);
        assert_eq!(config.normalizer.current_hour_tolerance, 0);
        assert_eq!(config.logging.level, "info");
        assert!(config.chat.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_are_configuration_errors() {
        let config = StyleConfig::default();
        let err = config.forecast_credential().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
        assert!(err.to_string().contains("KMA_SERVICE_KEY"));

        let err = config.chat_credential().unwrap_err();
        assert!(matches!(err, StyleError::Config { .. }));
    }

    #[test]
    fn test_credential_follows_provider() {
        let mut config = StyleConfig::default();
        config.forecast.kma.service_key = Some("kma-key".to_string());
        assert_eq!(config.forecast_credential().unwrap(), "kma-key");

        config.forecast.provider = ForecastProvider::OpenWeatherMap;
        assert!(config.forecast_credential().is_err());

        config.forecast.openweathermap.api_key = Some("owm-key".to_string());
        assert_eq!(config.forecast_credential().unwrap(), "owm-key");
    }

    #[test]
    fn test_credential_fallbacks() {
        let mut config = StyleConfig::default();
        config.chat.api_key = Some("from-config".to_string());
        config.apply_credential_fallbacks(|name| match name {
            "OPENAI_API_KEY" => Some("from-env".to_string()),
            "KMA_SERVICE_KEY" => Some("kma-env".to_string()),
            "OPENWEATHERMAP_API_KEY" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.chat.api_key.as_deref(), Some("from-config"));
        assert_eq!(config.forecast.kma.service_key.as_deref(), Some("kma-env"));
        assert!(config.forecast.openweathermap.api_key.is_none());
    }

    #[test]
    fn test_config_validation_empty_api_key() {
        let mut config = StyleConfig::default();
        config.chat.api_key = Some(String::new());
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = StyleConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = StyleConfig::default();
        config.forecast.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = StyleConfig::default();
        config.normalizer.precipitation_threshold_percent = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_timezone() {
        let mut config = StyleConfig::default();
        config.forecast.timezone = "Mars/Olympus".to_string();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Invalid time zone"));
    }

    #[test]
    fn test_apply_defaults_restores_zeroed_values() {
        let mut config = StyleConfig::default();
        config.forecast.timeout_seconds = 0;
        config.chat.model = String::new();
        config.apply_defaults();
        assert_eq!(config.forecast.timeout_seconds, 10);
        assert_eq!(config.chat.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[forecast]
provider = "openweathermap"
timeout_seconds = 5

[forecast.openweathermap]
api_key = "owm-test-key"

[normalizer]
precipitation_threshold_percent = 55
"#
        )
        .unwrap();

        let config = StyleConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.forecast.provider, ForecastProvider::OpenWeatherMap);
        assert_eq!(config.forecast.timeout_seconds, 5);
        assert_eq!(config.normalizer.precipitation_threshold_percent, 55);
        assert_eq!(config.forecast_credential().unwrap(), "owm-test-key");
        assert_eq!(config.chat.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("KMA".parse::<ForecastProvider>().unwrap(), ForecastProvider::Kma);
        assert_eq!(
            "owm".parse::<ForecastProvider>().unwrap(),
            ForecastProvider::OpenWeatherMap
        );
        assert!("metoffice".parse::<ForecastProvider>().is_err());
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = StyleConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("stylecast"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
