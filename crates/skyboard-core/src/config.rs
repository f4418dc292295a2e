use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "SKYBOARD_API_URL";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Weather API connection
    pub api: ApiConfig,

    /// Dashboard behavior
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// User identity
    #[serde(default)]
    pub user: UserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the weather API
    pub base_url: String,

    /// Transport timeout in seconds (0 disables it)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// When typed input becomes the committed location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommitMode {
    /// Commit after the input has been quiet for `debounce_ms`
    #[default]
    Debounce,
    /// Commit only on explicit submission
    Submit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Location shown on startup
    #[serde(default = "default_location")]
    pub default_location: String,

    #[serde(default)]
    pub commit_mode: CommitMode,

    /// Quiet period before typed input is committed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long save/export outcomes stay visible
    #[serde(default = "default_status_clear_ms")]
    pub status_clear_ms: u64,

    /// Number of days in the daily forecast
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

fn default_location() -> String {
    "Berlin".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_status_clear_ms() -> u64 {
    3000
}

fn default_forecast_days() -> u32 {
    5
}

impl DashboardConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn status_clear_delay(&self) -> Duration {
        Duration::from_millis(self.status_clear_ms)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_location: default_location(),
            commit_mode: CommitMode::default(),
            debounce_ms: default_debounce_ms(),
            status_clear_ms: default_status_clear_ms(),
            forecast_days: default_forecast_days(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// Name attached to saved readings; a random token is used when unset
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skyboard");

        Self {
            config_dir,
            api: ApiConfig::default(),
            dashboard: DashboardConfig::default(),
            user: UserConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            tracing::info!("Wrote default config to {}", config_path.display());
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load_validated_with(|_| {})
    }

    /// Load configuration, apply `adjust` (command-line overrides), then validate.
    pub fn load_validated_with(adjust: impl FnOnce(&mut Self)) -> Result<(Self, ValidationResult)> {
        let mut config = Self::load()?;
        adjust(&mut config);
        config.into_validated()
    }

    /// Validate, failing on errors and logging warnings.
    pub fn into_validated(self) -> Result<(Self, ValidationResult)> {
        let validation = self.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                tracing::debug!("API URL overridden by {}", API_URL_ENV);
                self.api.base_url = url.trim().to_string();
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.base_url, "api.base_url", &mut result);

        if self.api.timeout_secs == 0 {
            result.add_warning("api.timeout_secs", "Transport timeout disabled (0 seconds)");
        }

        if self.dashboard.default_location.trim().is_empty() {
            result.add_warning(
                "dashboard.default_location",
                "No default location; the dashboard starts empty",
            );
        }

        if self.dashboard.debounce_ms == 0 {
            result.add_warning(
                "dashboard.debounce_ms",
                "Debounce disabled; every keystroke issues a lookup",
            );
        } else if self.dashboard.debounce_ms > 10_000 {
            result.add_warning(
                "dashboard.debounce_ms",
                "Debounce is longer than 10 seconds",
            );
        }

        if self.dashboard.forecast_days == 0 {
            result.add_error("dashboard.forecast_days", "Forecast must cover at least 1 day");
        } else if self.dashboard.forecast_days > 16 {
            result.add_error(
                "dashboard.forecast_days",
                "Forecast cannot cover more than 16 days",
            );
        }

        if let Some(name) = &self.user.name {
            if name.chars().count() > 50 {
                result.add_error("user.name", "User name is limited to 50 characters");
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("skyboard").join("config.toml"))
    }
}
