//! Configuration management for flightlog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::settings::{CurrencySettings, DEFAULT_CURRENCY_PERIOD_DAYS, DEFAULT_MEDICAL_WARNING_DAYS};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightlog";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "logbook.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "FLIGHTLOG_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTLOG_`, sections split on `__`)
/// 2. TOML config file at `~/.config/flightlog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Values used until the pilot saves their own settings.
    pub defaults: DefaultsConfig,
    /// Backoff for bulk operations.
    pub retry: RetryConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightlog/logbook.db`
    pub database_path: Option<PathBuf>,
}

/// Fallback rule settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Currency look-back window in days.
    pub currency_period_days: u32,
    /// NG hours required within the window.
    pub ng_required_hours: f64,
    /// NS hours required within the window.
    pub ns_required_hours: f64,
    /// Days before the medical expires to start warning.
    pub medical_warning_days: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            currency_period_days: DEFAULT_CURRENCY_PERIOD_DAYS,
            ng_required_hours: 1.0,
            ns_required_hours: 1.0,
            medical_warning_days: DEFAULT_MEDICAL_WARNING_DAYS,
        }
    }
}

/// Retry configuration for bulk operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after a rate-limited attempt.
    pub max_retries: u32,
    /// First backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter bound in milliseconds.
    pub jitter_ms: u64,
    /// Pause between items in milliseconds.
    pub inter_op_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_ms: 500,
            inter_op_delay_ms: 100,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::extract(Self::figment(&config_file))
    }

    fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file).nested())
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.currency_defaults()
            .validate()
            .map_err(|error| match error {
                Error::InvalidInput { message } => Error::config_validation(message),
                other => other,
            })?;

        if self.defaults.medical_warning_days < 0 {
            return Err(Error::config_validation(
                "medical_warning_days cannot be negative",
            ));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::config_validation(format!(
                "base_delay_ms ({}) cannot be greater than max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Currency settings to use when none are stored.
    #[must_use]
    pub fn currency_defaults(&self) -> CurrencySettings {
        CurrencySettings {
            ng_required_hours: self.defaults.ng_required_hours,
            ns_required_hours: self.defaults.ns_required_hours,
            currency_period_days: self.defaults.currency_period_days,
        }
    }

    /// Backoff policy for bulk operations.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert_eq!(config.defaults.currency_period_days, 60);
        assert_eq!(config.retry.max_retries, 5);
    }

    #[test]
    fn test_default_defaults_config() {
        let defaults = DefaultsConfig::default();

        assert!((defaults.ng_required_hours - 1.0).abs() < f64::EPSILON);
        assert!((defaults.ns_required_hours - 1.0).abs() < f64::EPSILON);
        assert_eq!(defaults.medical_warning_days, 30);
    }

    #[test]
    fn test_default_retry_config() {
        let retry = RetryConfig::default();

        assert_eq!(retry.base_delay_ms, 1_000);
        assert_eq!(retry.max_delay_ms, 30_000);
        assert_eq!(retry.jitter_ms, 500);
        assert_eq!(retry.inter_op_delay_ms, 100);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_period() {
        let mut config = Config::default();
        config.defaults.currency_period_days = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("currency_period_days"));
    }

    #[test]
    fn test_validate_negative_threshold() {
        let mut config = Config::default();
        config.defaults.ns_required_hours = -1.0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("ns_required_hours"));
    }

    #[test]
    fn test_validate_nan_threshold() {
        let mut config = Config::default();
        config.defaults.ng_required_hours = f64::NAN;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_negative_warning_days() {
        let mut config = Config::default();
        config.defaults.medical_warning_days = -1;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("medical_warning_days"));
    }

    #[test]
    fn test_validate_base_delay_above_max() {
        let mut config = Config::default();
        config.retry.base_delay_ms = 60_000;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("base_delay_ms"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("logbook.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_currency_defaults() {
        let mut config = Config::default();
        config.defaults.currency_period_days = 90;
        config.defaults.ng_required_hours = 2.0;

        let currency = config.currency_defaults();
        assert_eq!(currency.currency_period_days, 90);
        assert!((currency.ng_required_hours - 2.0).abs() < f64::EPSILON);
        assert!((currency.ns_required_hours - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_retry_policy() {
        let policy = Config::default().retry_policy();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.inter_op_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("flightlog"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_default_data_dir() {
        let path = Config::default_data_dir();
        assert!(path.to_string_lossy().contains("flightlog"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                "[defaults]\ncurrency_period_days = 90\n\n[retry]\nmax_retries = 2\n",
            ));
        let config = Config::extract(figment).unwrap();

        assert_eq!(config.defaults.currency_period_days, 90);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.base_delay_ms, 1_000);
    }

    #[test]
    fn test_invalid_toml_values_are_rejected() {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string("[defaults]\ncurrency_period_days = 0\n"));

        assert!(matches!(
            Config::extract(figment),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("currency_period_days"));
        assert!(json.contains("inter_op_delay_ms"));
    }

    #[test]
    fn test_retry_config_deserialize() {
        let json = r#"{"max_retries": 1, "jitter_ms": 0}"#;
        let retry: RetryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(retry.max_retries, 1);
        assert_eq!(retry.jitter_ms, 0);
        assert_eq!(retry.max_delay_ms, 30_000);
    }
}
