//! Configuration for the settlement minimizer

use serde::{Deserialize, Serialize};

/// Minimizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Input size limits
    pub limits: LimitsConfig,

    /// Netting configuration
    pub netting: NettingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "cashflow-settlement".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            limits: LimitsConfig::default(),
            netting: NettingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Input size limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum transactions per run
    pub max_transactions: usize,

    /// Maximum distinct participants per run
    pub max_participants: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_transactions: 100_000,
            max_participants: 10_000,
        }
    }
}

/// Netting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NettingConfig {
    /// Replay every plan against the net positions before returning it
    pub verify_plan: bool,
}

impl Default for NettingConfig {
    fn default() -> Self {
        Self { verify_plan: true }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human readable ones
    pub json: bool,

    /// Level used when `RUST_LOG` is unset or invalid
    pub default_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            default_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `CASHFLOW_*` environment variables
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Ok(max) = std::env::var("CASHFLOW_MAX_TRANSACTIONS") {
            self.limits.max_transactions = parse_env("CASHFLOW_MAX_TRANSACTIONS", &max)?;
        }

        if let Ok(max) = std::env::var("CASHFLOW_MAX_PARTICIPANTS") {
            self.limits.max_participants = parse_env("CASHFLOW_MAX_PARTICIPANTS", &max)?;
        }

        if let Ok(verify) = std::env::var("CASHFLOW_VERIFY_PLAN") {
            self.netting.verify_plan = parse_env("CASHFLOW_VERIFY_PLAN", &verify)?;
        }

        if let Ok(json) = std::env::var("CASHFLOW_LOG_JSON") {
            self.logging.json = parse_env("CASHFLOW_LOG_JSON", &json)?;
        }

        if let Ok(level) = std::env::var("CASHFLOW_LOG_LEVEL") {
            self.logging.default_level = level;
        }

        self.validate()
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.limits.max_transactions == 0 {
            return Err(crate::Error::Config(
                "limits.max_transactions must be at least 1".into(),
            ));
        }

        if self.limits.max_participants < 2 {
            return Err(crate::Error::Config(
                "limits.max_participants must be at least 2".into(),
            ));
        }

        match self.logging.default_level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(crate::Error::Config(format!(
                "Unknown log level: {}",
                other
            ))),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> crate::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| crate::Error::Config(format!("Invalid value for {}: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.netting.verify_plan);
        assert_eq!(config.service_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[limits]\nmax_transactions = 50\n\n[logging]\njson = true"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.limits.max_transactions, 50);
        assert_eq!(config.limits.max_participants, 10_000);
        assert!(config.logging.json);
        assert_eq!(config.service_name, "cashflow-settlement");
    }

    #[test]
    fn test_from_file_rejects_bad_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmax_participants = 1").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(crate::Error::Config(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "limits = 3").unwrap();
        assert!(matches!(
            Config::from_file(file.path()),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/nonexistent/cashflow.toml").unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn test_unknown_log_level() {
        let mut config = Config::default();
        config.logging.default_level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env() {
        assert_eq!(parse_env::<usize>("X", " 42 ").unwrap(), 42);
        assert!(parse_env::<bool>("X", "true").unwrap());
        assert!(parse_env::<usize>("X", "many").is_err());
    }
}
