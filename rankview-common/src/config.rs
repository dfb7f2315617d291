//! Configuration loading and config file resolution
//!
//! All settings live in one optional TOML file. Every field has a built-in
//! default, so an absent file (or an absent section) is never fatal.
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `RANKVIEW_CONFIG` environment variable
//! 3. `<platform config dir>/rankview/config.toml`
//! 4. Built-in defaults (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RANKVIEW_CONFIG";

/// Root of the TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub kernel: KernelConfig,
    pub throttle: ThrottleConfig,
    pub service: ServiceConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Accumulator width used by the reconstruction kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// f32 accumulation (fastest)
    #[default]
    Single,
    /// f64 accumulation (lower rounding error at high rank)
    Double,
}

impl FromStr for Precision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "f32" => Ok(Precision::Single),
            "double" | "f64" => Ok(Precision::Double),
            other => Err(Error::Config(format!(
                "Unknown precision '{}' (expected single or double)",
                other
            ))),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Single => f.write_str("single"),
            Precision::Double => f.write_str("double"),
        }
    }
}

/// Reconstruction kernel settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub precision: Precision,
}

/// Rank-change throttling between the presentation layer and the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum interval between accepted rank changes (0 disables throttling)
    pub min_interval_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self { min_interval_ms: 100 }
    }
}

impl ThrottleConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Decomposition service endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 60_000,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve and load configuration following the priority order
    ///
    /// An explicitly named file (argument or environment) must exist. The
    /// platform default location is optional.
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_config_path(cli_arg) {
            return Self::load_from(&path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Config file named by the command line or the environment, if any
pub fn explicit_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => None,
    }
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rankview").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.kernel.precision, Precision::Single);
        assert_eq!(config.throttle.min_interval(), Duration::from_millis(100));
        assert_eq!(config.service.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TomlConfig::from_toml_str("[throttle]\nmin_interval_ms = 40\n").unwrap();
        assert_eq!(config.throttle.min_interval_ms, 40);
        assert_eq!(config.kernel.precision, Precision::Single);
        assert_eq!(config.service.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_precision_from_toml() {
        let config = TomlConfig::from_toml_str("[kernel]\nprecision = \"double\"\n").unwrap();
        assert_eq!(config.kernel.precision, Precision::Double);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("[kernel]\nprecision = \"quad\"\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_precision_parse() {
        assert_eq!("Double".parse::<Precision>().unwrap(), Precision::Double);
        assert_eq!("f32".parse::<Precision>().unwrap(), Precision::Single);
        assert!("half".parse::<Precision>().is_err());
    }
}
